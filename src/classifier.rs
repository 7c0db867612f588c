//! Keyword based article labeling.
//!
//! Text is lower-cased and checked against ordered keyword groups. The first
//! group with a keyword contained in the text decides the category, so the
//! order of [`RULES`] matters for text that mentions several topics.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Ai,
    Finance,
    Programming,
    Other,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Ai,
        Category::Finance,
        Category::Programming,
        Category::Other,
    ];

    /// The label stored in the `category` column.
    pub fn label(self) -> &'static str {
        match self {
            Category::Ai => "AI",
            Category::Finance => "Finance",
            Category::Programming => "Programming",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Keywords must be lower-case.
const RULES: [(Category, &[&str]); 3] = [
    (Category::Ai, &["ai", "gpt", "模型", "智能"]),
    (
        Category::Finance,
        &[
            "价格", "股市", "基金", "赚钱", "财经", "price", "pricing", "stock", "fund", "finance",
        ],
    ),
    (
        Category::Programming,
        &["python", "代码", "开发", "web", "code", "programming", "rust"],
    ),
];

pub fn classify(text: &str) -> Category {
    let text = text.to_lowercase();
    RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| text.contains(k)))
        .map(|(category, _)| *category)
        .unwrap_or(Category::Other)
}
