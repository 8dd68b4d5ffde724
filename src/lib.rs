//! # xlesson: the interactive-lesson pipeline
//!
//! `xlesson` turns lesson text into renderable, interactive content and runs learner
//! code safely:
//!
//! - **Tokenizer** ([`markup`]): splits lesson source into prose, fenced code and
//!   triple-colon directives. Total; malformed input degrades to prose.
//! - **Directive parser** ([`directive`]): typed components (quiz, fill-blank,
//!   exercise, challenge, drag-drop, ...) with per-segment errors.
//! - **Inline renderer** ([`render`]): prose to a markup tree and HTML.
//! - **Execution sandbox** ([`sandbox`]): JavaScript in an isolated boa worker behind a
//!   safety denylist and two timeouts; HTML/CSS previews.
//! - **Test-case validator** ([`validator`]): structured invocation of `main` per case.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use xlesson::{render_lesson, Sandbox, TestCase, Validator};
//!
//! #[tokio::main]
//! async fn main() {
//!     let lesson = render_lesson("# Doubling\n\n:::quiz\n2 * 2?\n- [x] 4\n- [ ] 5\n:::\n");
//!     println!("{}", lesson.to_html());
//!
//!     let validator = Validator::new(Arc::new(Sandbox::default()));
//!     let report = validator
//!         .validate(
//!             "function main(x) { return x * 2; }",
//!             &[TestCase::new(json!(2), json!(4), "double")],
//!         )
//!         .await;
//!     assert_eq!(report.passed_count, 1);
//! }
//! ```

pub mod config;
pub mod directive;
pub mod error;
pub mod lesson;
pub mod markup;
pub mod render;
pub mod sandbox;
pub mod validator;

pub use config::{SandboxConfig, ValidatorConfig, WorkerConfig, WorkerIsolation, XlessonConfig};
pub use directive::{parse as parse_directive, InteractiveComponent};
pub use error::{ConfigError, ExecutionError, MalformedDirectiveError};
pub use lesson::{render_lesson, ComponentSlot, LessonBlock, RenderedLesson};
pub use markup::{tokenize, LessonDocument, Segment};
pub use render::{render_prose, MarkupTree};
pub use sandbox::{CodeSandbox, ExecutionResult, ExecutionStatus, Language, Sandbox};
pub use validator::{TestCase, TestRunReport, TestVerdict, Validator};

pub use xlesson_sandbox_js::{LogLevel, LogLine};
