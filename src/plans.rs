/// A purchasable subscription tier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plan {
    pub name: &'static str,
    pub price: f64,
    pub features: &'static [&'static str],
    pub payment_link: &'static str,
}

impl Plan {
    pub fn price_label(&self) -> String {
        format!("${}/month", self.price)
    }
}

const PAYMENT_LINK: &str = "https://buy.stripe.com/test_5kA8wQcP55v69yg5kk";

pub const PLANS: [Plan; 3] = [
    Plan {
        name: "Basic",
        price: 9.99,
        features: &[
            "40 conversations per month",
            "Long term memory",
            "Voice generation",
            "Unlock NSFW image generation",
        ],
        payment_link: PAYMENT_LINK,
    },
    Plan {
        name: "Intermediate",
        price: 19.99,
        features: &[
            "100 conversations per month",
            "Long term memory",
            "Voice generation",
            "Unlock NSFW image generation",
        ],
        payment_link: PAYMENT_LINK,
    },
    Plan {
        name: "Advanced",
        price: 49.99,
        features: &[
            "300 conversations",
            "Long term memory",
            "Voice generation",
            "Customize AI girlfriend",
            "Unlock NSFW image generation",
        ],
        payment_link: PAYMENT_LINK,
    },
];
