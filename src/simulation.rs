//! Built-in sample problems that guarantee a well-formed result
//! even without a language model or when the model's output is unusable.
//!
//! Output depends only on (part, source text, difficulty); the slot index of a
//! multi-problem request is not an input.

use crate::domain::{Choice, Difficulty, Problem, ToeicPart};

/// Used in the Part 6 memo when the source text has fewer than three words.
const DEFAULT_KEYWORD: &str = "meeting";

pub fn simulate_problem(part: ToeicPart, source_text: &str, difficulty: Option<Difficulty>) -> Problem {
  let difficulty = difficulty.unwrap_or_default();
  match part {
    ToeicPart::Part5 => Problem {
      part,
      question_type: "grammar".into(),
      passage: None,
      question: "The project deadline _______ extended due to unforeseen circumstances.".into(),
      choices: vec![
        Choice::new("A", "was", true),
        Choice::new("B", "were", false),
        Choice::new("C", "is", false),
        Choice::new("D", "be", false),
      ],
      answer: "A".into(),
      explanation: "'Deadline' is singular, so the correct verb form is 'was' (past tense, singular). 'Were' is for plural subjects, 'is' is present tense, and 'be' requires an auxiliary.".into(),
      difficulty,
    },
    ToeicPart::Part6 => {
      let keyword = source_text.split_whitespace().nth(2).unwrap_or(DEFAULT_KEYWORD);
      Problem {
        part,
        question_type: "context".into(),
        passage: Some(format!(
          "Dear Team,\n\nWe would like to inform you that the quarterly {keyword} has been rescheduled. _______ We apologize for any inconvenience this may cause.\n\nBest regards,\nManagement"
        )),
        question: "Which sentence best fits in the blank?".into(),
        choices: vec![
          Choice::new("A", "The new date will be announced shortly.", true),
          Choice::new("B", "Please submit your reports.", false),
          Choice::new("C", "The office will be closed.", false),
          Choice::new("D", "Thank you for your cooperation.", false),
        ],
        answer: "A".into(),
        explanation: "Option A logically follows the announcement of rescheduling by promising information about the new date. It maintains coherence with the topic of schedule changes.".into(),
        difficulty,
      }
    }
    ToeicPart::Part7 => Problem {
      part,
      question_type: "reading comprehension".into(),
      passage: Some(format!(
        "MEMO\n\nTo: All Staff\nFrom: HR Department\nSubject: Policy Update\n\nEffective next month, all employees will be required to complete the new compliance training. The training can be accessed through our online portal and must be completed within two weeks of the start date. {source_text}"
      )),
      question: "What is indicated about the training?".into(),
      choices: vec![
        Choice::new("A", "It must be completed online.", true),
        Choice::new("B", "It is optional for senior staff.", false),
        Choice::new("C", "It starts immediately.", false),
        Choice::new("D", "It takes two months to complete.", false),
      ],
      answer: "A".into(),
      explanation: "The memo states that 'The training can be accessed through our online portal,' indicating it must be completed online. The other options contradict the information given.".into(),
      difficulty,
    },
  }
}
