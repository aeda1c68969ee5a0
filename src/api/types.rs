use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct RegisterUserRequest {
    pub google_sub: String,
    pub user_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub user_id: i64,
    pub user_name: String,
    pub email: String,
    /// `None` means the backend does not meter this user.
    #[serde(default)]
    pub token: Option<i64>,
    #[serde(default)]
    pub pro_member: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserInfoResponse {
    pub user: UserInfo,
    #[serde(rename = "conversationCount", default)]
    pub conversation_count: Option<u64>,
}

/// Stored history as parallel arrays aligned by turn index.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub transcript: Vec<Option<String>>,
    #[serde(default)]
    pub response: Vec<Option<String>>,
    #[serde(rename = "filenameUser", default)]
    pub filename_user: Vec<Option<String>>,
    #[serde(rename = "filenameAI", default)]
    pub filename_ai: Vec<Option<String>>,
    #[serde(rename = "imageURL", default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextInput<'a> {
    pub text: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessInputResponse {
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(rename = "filenameUser", default)]
    pub filename_user: Option<String>,
    #[serde(rename = "filenameAI", default)]
    pub filename_ai: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NsfwRequest {
    #[serde(rename = "isNSFW")]
    pub is_nsfw: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: i64,
    pub timestamp: String,
    pub price: f64,
    pub order_id: String,
    pub plan: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentRecordsResponse {
    #[serde(default)]
    pub payments: Vec<Payment>,
}

/// Raw bytes of a fetched binary plus the MIME type the server reported.
#[derive(Debug, Clone)]
pub struct FetchedBinary {
    pub bytes: Vec<u8>,
    pub mime: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::{HistoryResponse, ProcessInputResponse, UserInfoResponse};

    #[test]
    fn history_tolerates_nulls_and_missing_arrays() {
        let history: HistoryResponse = serde_json::from_str(
            r#"{"transcript":["hi",null],"response":["hello","bye"],"filenameAI":["b.wav",null],"imageURL":null}"#,
        )
        .expect("history should parse");
        assert_eq!(history.transcript, vec![Some("hi".to_string()), None]);
        assert!(history.filename_user.is_empty());
        assert_eq!(history.filename_ai[0].as_deref(), Some("b.wav"));
        assert!(history.image_url.is_none());
    }

    #[test]
    fn user_info_token_may_be_null() {
        let info: UserInfoResponse = serde_json::from_str(
            r#"{"user":{"user_id":3,"user_name":"Ada","email":"a@example.com","token":null,"pro_member":true},"conversationCount":12}"#,
        )
        .expect("user info should parse");
        assert_eq!(info.user.token, None);
        assert!(info.user.pro_member);
        assert_eq!(info.conversation_count, Some(12));
    }

    #[test]
    fn process_input_reads_camel_case_file_names() {
        let reply: ProcessInputResponse = serde_json::from_str(
            r#"{"transcript":"hey","response":"hi there","filenameUser":"u.wav","filenameAI":"a.wav"}"#,
        )
        .expect("reply should parse");
        assert_eq!(reply.filename_user.as_deref(), Some("u.wav"));
        assert_eq!(reply.filename_ai.as_deref(), Some("a.wav"));
    }
}
