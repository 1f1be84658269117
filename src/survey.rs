use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationErrors};
use crate::models::Pillar;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QuestionKind {
    Text {
        #[serde(default)]
        min_length: usize,
    },
    Number,
    YesNo,
    SingleChoice {
        options: Vec<String>,
    },
    MultiChoice {
        options: Vec<String>,
    },
    Rating {
        min: i32,
        max: i32,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub depends_on: String,
    pub show_when: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    YesNo(bool),
    Number(f64),
    Text(String),
    Choices(Vec<String>),
}

pub type Answers = BTreeMap<String, Answer>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PillarQuestion {
    pub pillar: Pillar,
    pub question_id: String,
    pub prompt: String,
    pub kind: QuestionKind,
    pub required: bool,
    pub conditional: Option<Condition>,
    pub sort_order: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PillarResponse {
    pub pillar: Pillar,
    pub response_date: NaiveDate,
    pub answers: Answers,
}

impl Answer {
    pub fn as_strings(&self) -> Vec<String> {
        match self {
            Answer::YesNo(true) => vec!["yes".to_string()],
            Answer::YesNo(false) => vec!["no".to_string()],
            Answer::Number(value) => vec![value.to_string()],
            Answer::Text(text) => vec![text.trim().to_string()],
            Answer::Choices(items) => items.clone(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            Answer::Text(text) => text.trim().is_empty(),
            Answer::Choices(items) => items.is_empty(),
            Answer::YesNo(_) | Answer::Number(_) => false,
        }
    }
}

impl Condition {
    pub fn is_met_by(&self, answer: Option<&Answer>) -> bool {
        let Some(answer) = answer else {
            return false;
        };
        answer.as_strings().iter().any(|given| {
            self.show_when
                .iter()
                .any(|expected| expected.eq_ignore_ascii_case(given))
        })
    }
}

/// Checks only the direct dependency; see [`visible_questions`] for chains.
pub fn is_visible(question: &PillarQuestion, answers: &Answers) -> bool {
    match &question.conditional {
        None => true,
        Some(condition) => condition.is_met_by(answers.get(&condition.depends_on)),
    }
}

/// A question whose dependency is not an active, visible question is hidden.
pub fn visible_questions<'a>(
    questions: &'a [PillarQuestion],
    answers: &Answers,
) -> Vec<&'a PillarQuestion> {
    let mut visible: Vec<&PillarQuestion> = questions
        .iter()
        .filter(|question| question.is_active && chain_visible(questions, question, answers, 0))
        .collect();
    visible.sort_by_key(|question| question.sort_order);
    visible
}

fn chain_visible(
    questions: &[PillarQuestion],
    question: &PillarQuestion,
    answers: &Answers,
    depth: usize,
) -> bool {
    if depth > questions.len() || !is_visible(question, answers) {
        return false;
    }
    let Some(condition) = &question.conditional else {
        return true;
    };
    match questions
        .iter()
        .find(|candidate| candidate.is_active && candidate.question_id == condition.depends_on)
    {
        Some(parent) => chain_visible(questions, parent, answers, depth + 1),
        None => false,
    }
}

pub fn prune_hidden_answers(questions: &[PillarQuestion], answers: &Answers) -> Answers {
    let visible = visible_questions(questions, answers);
    answers
        .iter()
        .filter(|(id, _)| visible.iter().any(|q| &q.question_id == *id))
        .map(|(id, answer)| (id.clone(), answer.clone()))
        .collect()
}

pub fn validate_answers(questions: &[PillarQuestion], answers: &Answers) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    for question in visible_questions(questions, answers) {
        match answers.get(&question.question_id) {
            Some(answer) if !answer.is_blank() => {
                if let Err(err) = check_answer(question, answer) {
                    errors.push(err);
                }
            }
            _ if question.required => errors.push(ValidationError::Required {
                field: question.question_id.clone(),
            }),
            _ => {}
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

fn check_answer(question: &PillarQuestion, answer: &Answer) -> Result<(), ValidationError> {
    let field = || question.question_id.clone();

    match (&question.kind, answer) {
        (QuestionKind::Text { min_length }, Answer::Text(text)) => {
            let actual = text.trim().chars().count();
            if actual < *min_length {
                return Err(ValidationError::TooShort {
                    field: field(),
                    min: *min_length,
                    actual,
                });
            }
            Ok(())
        }
        (QuestionKind::Number, Answer::Number(_)) => Ok(()),
        (QuestionKind::YesNo, Answer::YesNo(_)) => Ok(()),
        (QuestionKind::SingleChoice { options }, Answer::Text(choice)) => {
            ensure_option(options, choice, field)
        }
        (QuestionKind::MultiChoice { options }, Answer::Choices(choices)) => {
            for choice in choices {
                ensure_option(options, choice, field)?;
            }
            Ok(())
        }
        (QuestionKind::Rating { min, max }, Answer::Number(value)) => {
            let (min, max) = (f64::from(*min), f64::from(*max));
            if *value < min || *value > max {
                return Err(ValidationError::OutOfRange {
                    field: field(),
                    value: *value,
                    min,
                    max,
                });
            }
            Ok(())
        }
        (kind, _) => Err(ValidationError::WrongAnswerType {
            field: field(),
            expected: expected_type(kind),
        }),
    }
}

fn ensure_option(
    options: &[String],
    choice: &str,
    field: impl FnOnce() -> String,
) -> Result<(), ValidationError> {
    if options.iter().any(|option| option == choice) {
        Ok(())
    } else {
        Err(ValidationError::InvalidChoice {
            field: field(),
            value: choice.to_string(),
        })
    }
}

fn expected_type(kind: &QuestionKind) -> &'static str {
    match kind {
        QuestionKind::Text { .. } => "text",
        QuestionKind::Number => "number",
        QuestionKind::YesNo => "yes/no",
        QuestionKind::SingleChoice { .. } => "single choice",
        QuestionKind::MultiChoice { .. } => "multiple choice",
        QuestionKind::Rating { .. } => "rating",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, kind: QuestionKind, required: bool, conditional: Option<Condition>) -> PillarQuestion {
        PillarQuestion {
            pillar: Pillar::Safety,
            question_id: id.to_string(),
            prompt: format!("{id}?"),
            kind,
            required,
            conditional,
            sort_order: 0,
            is_active: true,
        }
    }

    fn safety_form() -> Vec<PillarQuestion> {
        vec![
            question("incident", QuestionKind::YesNo, true, None),
            question(
                "incident_details",
                QuestionKind::Text { min_length: 10 },
                true,
                Some(Condition {
                    depends_on: "incident".to_string(),
                    show_when: vec!["Yes".to_string()],
                }),
            ),
            question(
                "severity",
                QuestionKind::SingleChoice {
                    options: vec!["minor".to_string(), "major".to_string()],
                },
                true,
                Some(Condition {
                    depends_on: "incident_details".to_string(),
                    show_when: vec!["n/a".to_string()],
                }),
            ),
        ]
    }

    #[test]
    fn conditional_question_follows_dependency_answer() {
        let form = safety_form();
        let mut answers = Answers::new();
        assert!(!is_visible(&form[1], &answers));

        answers.insert("incident".to_string(), Answer::YesNo(false));
        assert!(!is_visible(&form[1], &answers));

        answers.insert("incident".to_string(), Answer::YesNo(true));
        assert!(is_visible(&form[1], &answers));
    }

    #[test]
    fn hidden_parent_hides_child() {
        let form = safety_form();
        let mut answers = Answers::new();
        answers.insert("incident".to_string(), Answer::YesNo(false));
        answers.insert("incident_details".to_string(), Answer::Text("n/a".to_string()));

        assert!(is_visible(&form[2], &answers));
        let ids: Vec<&str> = visible_questions(&form, &answers)
            .iter()
            .map(|q| q.question_id.as_str())
            .collect();
        assert_eq!(ids, vec!["incident"]);
    }

    #[test]
    fn hidden_questions_are_never_required() {
        let form = safety_form();
        let mut answers = Answers::new();
        answers.insert("incident".to_string(), Answer::YesNo(false));
        assert_eq!(validate_answers(&form, &answers), Ok(()));
    }

    #[test]
    fn visible_required_text_enforces_minimum_length() {
        let form = safety_form();
        let mut answers = Answers::new();
        answers.insert("incident".to_string(), Answer::YesNo(true));
        answers.insert("incident_details".to_string(), Answer::Text("slip".to_string()));

        let errors = validate_answers(&form, &answers).unwrap_err();
        assert_eq!(
            errors.0,
            vec![ValidationError::TooShort {
                field: "incident_details".to_string(),
                min: 10,
                actual: 4,
            }]
        );
    }

    #[test]
    fn reports_every_violation() {
        let form = vec![
            question("headcount", QuestionKind::Number, true, None),
            question("morale", QuestionKind::Rating { min: 1, max: 5 }, false, None),
            question(
                "areas",
                QuestionKind::MultiChoice {
                    options: vec!["line 1".to_string(), "line 2".to_string()],
                },
                false,
                None,
            ),
        ];
        let mut answers = Answers::new();
        answers.insert("morale".to_string(), Answer::Number(7.0));
        answers.insert(
            "areas".to_string(),
            Answer::Choices(vec!["line 1".to_string(), "dock".to_string()]),
        );

        let errors = validate_answers(&form, &answers).unwrap_err();
        assert_eq!(errors.0.len(), 3);
        assert!(matches!(errors.0[0], ValidationError::Required { .. }));
        assert!(matches!(errors.0[1], ValidationError::OutOfRange { .. }));
        assert!(matches!(errors.0[2], ValidationError::InvalidChoice { .. }));
    }

    #[test]
    fn mismatched_answer_type_is_rejected() {
        let form = vec![question("headcount", QuestionKind::Number, false, None)];
        let mut answers = Answers::new();
        answers.insert("headcount".to_string(), Answer::Text("twelve".to_string()));
        let errors = validate_answers(&form, &answers).unwrap_err();
        assert_eq!(
            errors.0,
            vec![ValidationError::WrongAnswerType {
                field: "headcount".to_string(),
                expected: "number",
            }]
        );
    }

    #[test]
    fn child_of_retired_parent_is_hidden() {
        // The form as loaded holds only active questions.
        let form: Vec<PillarQuestion> = safety_form().into_iter().skip(1).take(1).collect();
        let mut answers = Answers::new();
        answers.insert("incident".to_string(), Answer::YesNo(true));
        answers.insert("incident_details".to_string(), Answer::Text("forklift".to_string()));

        assert!(visible_questions(&form, &answers).is_empty());
        assert_eq!(validate_answers(&form, &answers), Ok(()));
        assert!(prune_hidden_answers(&form, &answers).is_empty());
    }

    #[test]
    fn inactive_parent_in_form_hides_child() {
        let mut form = safety_form();
        form[0].is_active = false;
        let mut answers = Answers::new();
        answers.insert("incident".to_string(), Answer::YesNo(true));
        answers.insert("incident_details".to_string(), Answer::Text("forklift near dock".to_string()));

        assert!(visible_questions(&form, &answers).is_empty());
        assert!(prune_hidden_answers(&form, &answers).is_empty());
    }

    #[test]
    fn pruning_drops_hidden_and_unknown_answers() {
        let form = safety_form();
        let mut answers = Answers::new();
        answers.insert("incident".to_string(), Answer::YesNo(false));
        answers.insert("incident_details".to_string(), Answer::Text("stale text".to_string()));
        answers.insert("unrelated".to_string(), Answer::Number(1.0));

        let pruned = prune_hidden_answers(&form, &answers);
        assert_eq!(pruned.len(), 1);
        assert!(pruned.contains_key("incident"));
    }

    #[test]
    fn kinds_and_answers_decode_from_stored_json() {
        let kind: QuestionKind =
            serde_json::from_str(r#"{"type":"single_choice","options":["a","b"]}"#).unwrap();
        assert_eq!(
            kind,
            QuestionKind::SingleChoice {
                options: vec!["a".to_string(), "b".to_string()]
            }
        );

        let answers: Answers =
            serde_json::from_str(r#"{"q1":true,"q2":3,"q3":"ok","q4":["x"]}"#).unwrap();
        assert_eq!(answers["q1"], Answer::YesNo(true));
        assert_eq!(answers["q2"], Answer::Number(3.0));
        assert_eq!(answers["q3"], Answer::Text("ok".to_string()));
        assert_eq!(answers["q4"], Answer::Choices(vec!["x".to_string()]));
    }
}
