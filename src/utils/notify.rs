use std::fmt;
use async_trait::async_trait;
use crate::models::Grade;

// Receiver of newly detected grades. Delivery is best effort.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, grades: &[Grade], username: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub subject: String,
    pub body: String,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\n\n{}", self.subject, self.body)
    }
}

// A single grade gets a sentence; several get one line each.
pub fn compose_message(grades: &[Grade]) -> Message {
    match grades {
        [grade] => Message {
            subject: format!("{} from {}", grade.assessment, grade.course),
            body: format!(
                "You got a grade of {} from {} {}.",
                grade.assessment, grade.course, grade.assessment_type
            ),
        },
        _ => Message {
            subject: "New Grades".to_string(),
            body: grades
                .iter()
                .map(|g| format!("{} from {} {}", g.assessment, g.course, g.assessment_type))
                .collect::<Vec<_>>()
                .join("\n"),
        },
    }
}
