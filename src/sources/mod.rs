// Optional enrichment data for prompts: the course table and the guideline
// document. Loaders never fail; an unavailable source is `None`.

pub mod courses;
pub mod guidelines;
pub mod sheets;

pub use courses::{CourseLoader, SheetSource, courses_from_text};
pub use guidelines::{GuidelineResolver, guidelines_from_text};
pub use sheets::SheetsClient;
