use crate::error::Result;
use askama::Template;
use std::borrow::Cow;
use tracing::warn;

pub const SYSTEM_PROMPT: &str = r#"あなたは「ねんねママのファミリーシップ」のAIコンシェルジュです。子育て中の保護者から寄せられる育児の悩みや質問に、専門的な知識を持つ相談員として答えます。

回答のルール:
- まず相談者の気持ちに寄り添い、共感の言葉から始めてください。
- 専門用語は避け、わかりやすい言葉で説明してください。
- 断定的な医療判断はせず、必要に応じて医師や専門機関への相談を勧めてください。
- 講座を提案する場合は、講座名と、その講座がなぜ悩みの解決に役立つのかを簡潔に添えてください。
- データに存在しない講座や情報を作り出さないでください。
- 回答は読みやすい長さにまとめ、箇条書きを適度に使ってください。"#;

/// Heading that introduces the course table inside a prompt.
pub const COURSE_SECTION_HEADER: &str = "# 講座データベース（CSV形式）";
/// Heading that introduces the guideline document inside a prompt.
pub const GUIDELINE_SECTION_HEADER: &str = "# 参考ガイドライン";

const TRUNCATION_MARKER: &str = "\n…（以下省略）";

#[derive(Template)]
#[template(path = "prompt.txt")]
struct PromptTemplate<'a> {
    system_prompt: &'a str,
    question: &'a str,
    courses: Option<&'a str>,
    guidelines: Option<&'a str>,
}

/// Assembles the single text prompt sent to the model.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    max_context_chars: usize,
}

impl PromptBuilder {
    pub fn new(max_context_chars: usize) -> Self {
        Self { max_context_chars }
    }

    pub fn build(
        &self,
        question: &str,
        course_data: Option<&str>,
        guidelines: Option<&str>,
    ) -> Result<String> {
        let courses = non_blank(course_data).map(|c| self.bounded("course data", c));
        let guidelines = non_blank(guidelines).map(|g| self.bounded("guidelines", g));

        let prompt = PromptTemplate {
            system_prompt: SYSTEM_PROMPT,
            question,
            courses: courses.as_deref(),
            guidelines: guidelines.as_deref(),
        }
        .render()?;
        Ok(prompt)
    }

    fn bounded<'a>(&self, label: &str, text: &'a str) -> Cow<'a, str> {
        match text.char_indices().nth(self.max_context_chars) {
            None => Cow::Borrowed(text),
            Some((cut, _)) => {
                warn!(
                    section = label,
                    limit = self.max_context_chars,
                    "context section exceeds limit, truncating"
                );
                Cow::Owned(format!("{}{TRUNCATION_MARKER}", &text[..cut]))
            }
        }
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(100_000)
    }
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.filter(|t| !t.trim().is_empty())
}
