use crate::{
    error::{AppError, AppResult},
    models::{AnswerMatrix, Selection},
};

/// Where the quiz stands after a navigation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizProgress {
    /// Now showing the question at this index
    AtQuestion(usize),
    /// The last question was left forward; carries the final answers
    Completed(AnswerMatrix),
}

/// Multi-select quiz aggregator for one user session
///
/// Selections for the current question are held in an in-progress set and
/// only written into the matrix when the user navigates. Loading a question
/// always restores whatever was last stored for it, so back/forward
/// navigation never loses answers; only `skip` clears them.
#[derive(Debug, Clone)]
pub struct QuizSession {
    current: usize,
    answers: AnswerMatrix,
    in_progress: Selection,
}

impl QuizSession {
    /// Starts a quiz over `question_count` questions at the first question
    pub fn new(question_count: usize) -> AppResult<Self> {
        if question_count == 0 {
            return Err(AppError::InvalidInput(
                "A quiz needs at least one question".to_string(),
            ));
        }

        Ok(Self {
            current: 0,
            answers: AnswerMatrix::empty(question_count),
            in_progress: Selection::new(),
        })
    }

    pub fn question_count(&self) -> usize {
        self.answers.len()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn is_last_question(&self) -> bool {
        self.current + 1 == self.question_count()
    }

    /// Selections currently shown for the active question
    pub fn current_selections(&self) -> &Selection {
        &self.in_progress
    }

    /// Answers persisted so far; the active question's in-progress set is not included
    pub fn answers(&self) -> &AnswerMatrix {
        &self.answers
    }

    /// Adds `value` to the in-progress set, or removes it if already selected
    pub fn toggle_selection(&mut self, value: &str) {
        if !self.in_progress.remove(value) {
            self.in_progress.insert(value.to_string());
        }
    }

    /// Persists the in-progress set and moves forward, completing on the last question
    pub fn go_next(&mut self) -> QuizProgress {
        self.persist_current();
        self.advance()
    }

    /// Persists the in-progress set and moves back; stays put on the first question
    pub fn go_back(&mut self) -> QuizProgress {
        self.persist_current();
        if self.current > 0 {
            self.load(self.current - 1);
        } else {
            tracing::debug!("Ignoring back navigation on the first question");
        }
        QuizProgress::AtQuestion(self.current)
    }

    /// Stores an empty selection for the active question, then moves forward
    pub fn skip(&mut self) -> QuizProgress {
        self.in_progress.clear();
        self.answers.store(self.current, Selection::new());
        self.advance()
    }

    /// Discards every answer and returns to the first question
    pub fn restart(&mut self) {
        self.answers = AnswerMatrix::empty(self.question_count());
        self.load(0);
    }

    fn persist_current(&mut self) {
        self.answers.store(self.current, self.in_progress.clone());
    }

    fn advance(&mut self) -> QuizProgress {
        if self.is_last_question() {
            tracing::debug!(
                questions = self.question_count(),
                "Quiz completed"
            );
            return QuizProgress::Completed(self.answers.clone());
        }

        self.load(self.current + 1);
        QuizProgress::AtQuestion(self.current)
    }

    fn load(&mut self, index: usize) {
        self.current = index.min(self.question_count() - 1);
        self.in_progress = self
            .answers
            .get(self.current)
            .cloned()
            .unwrap_or_default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selection(values: &[&str]) -> Selection {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn completed(progress: QuizProgress) -> AnswerMatrix {
        match progress {
            QuizProgress::Completed(matrix) => matrix,
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[test]
    fn test_new_rejects_empty_quiz() {
        assert!(QuizSession::new(0).is_err());
    }

    #[test]
    fn test_toggle_flips_membership() {
        let mut quiz = QuizSession::new(3).unwrap();
        quiz.toggle_selection("a");
        quiz.toggle_selection("b");
        quiz.toggle_selection("a");
        assert_eq!(quiz.current_selections(), &selection(&["b"]));
    }

    #[test]
    fn test_toggle_is_not_persisted_until_navigation() {
        let mut quiz = QuizSession::new(3).unwrap();
        quiz.toggle_selection("a");
        assert!(quiz.answers().get(0).unwrap().is_empty());

        assert_eq!(quiz.go_next(), QuizProgress::AtQuestion(1));
        assert_eq!(quiz.answers().get(0), Some(&selection(&["a"])));
    }

    #[test]
    fn test_selections_survive_back_and_forth() {
        let mut quiz = QuizSession::new(3).unwrap();
        quiz.toggle_selection("a");
        quiz.go_next();
        quiz.toggle_selection("b");
        quiz.toggle_selection("c");
        quiz.go_next();

        assert_eq!(quiz.go_back(), QuizProgress::AtQuestion(1));
        assert_eq!(quiz.current_selections(), &selection(&["b", "c"]));

        assert_eq!(quiz.go_back(), QuizProgress::AtQuestion(0));
        assert_eq!(quiz.current_selections(), &selection(&["a"]));

        quiz.go_next();
        assert_eq!(quiz.current_selections(), &selection(&["b", "c"]));
    }

    #[test]
    fn test_back_persists_current_question() {
        let mut quiz = QuizSession::new(3).unwrap();
        quiz.go_next();
        quiz.toggle_selection("x");
        quiz.go_back();
        assert_eq!(quiz.answers().get(1), Some(&selection(&["x"])));

        quiz.go_next();
        assert_eq!(quiz.current_selections(), &selection(&["x"]));
    }

    #[test]
    fn test_back_on_first_question_is_absorbed() {
        let mut quiz = QuizSession::new(2).unwrap();
        quiz.toggle_selection("a");
        assert_eq!(quiz.go_back(), QuizProgress::AtQuestion(0));
        assert_eq!(quiz.current_index(), 0);
        assert_eq!(quiz.current_selections(), &selection(&["a"]));
        assert_eq!(quiz.answers().get(0), Some(&selection(&["a"])));
    }

    #[test]
    fn test_skip_discards_in_progress_and_stored_answers() {
        let mut quiz = QuizSession::new(3).unwrap();
        quiz.toggle_selection("a");
        quiz.go_next();
        quiz.go_back();
        assert_eq!(quiz.current_selections(), &selection(&["a"]));

        quiz.toggle_selection("b");
        assert_eq!(quiz.skip(), QuizProgress::AtQuestion(1));
        assert!(quiz.answers().get(0).unwrap().is_empty());

        quiz.go_back();
        assert!(quiz.current_selections().is_empty());
    }

    #[test]
    fn test_next_on_last_question_completes() {
        let mut quiz = QuizSession::new(2).unwrap();
        quiz.toggle_selection("a");
        quiz.go_next();
        assert!(quiz.is_last_question());
        quiz.toggle_selection("z");

        let answers = completed(quiz.go_next());
        assert_eq!(answers.len(), 2);
        assert_eq!(answers.get(0), Some(&selection(&["a"])));
        assert_eq!(answers.get(1), Some(&selection(&["z"])));
    }

    #[test]
    fn test_skip_on_last_question_completes_with_empty_entry() {
        let mut quiz = QuizSession::new(2).unwrap();
        quiz.go_next();
        quiz.toggle_selection("z");

        let answers = completed(quiz.skip());
        assert_eq!(answers.len(), 2);
        assert!(answers.get(1).unwrap().is_empty());
    }

    #[test]
    fn test_skipping_everything_yields_full_length_blank_matrix() {
        let mut quiz = QuizSession::new(15).unwrap();
        let mut last = quiz.skip();
        for _ in 0..14 {
            last = quiz.skip();
        }
        let answers = completed(last);
        assert_eq!(answers.len(), 15);
        assert!(answers.is_blank());
    }

    #[test]
    fn test_navigation_after_completion_stays_total() {
        let mut quiz = QuizSession::new(1).unwrap();
        quiz.toggle_selection("a");
        completed(quiz.go_next());
        assert_eq!(quiz.current_index(), 0);
        assert_eq!(quiz.current_selections(), &selection(&["a"]));
        let again = completed(quiz.go_next());
        assert_eq!(again.get(0), Some(&selection(&["a"])));
    }

    #[test]
    fn test_restart_clears_everything() {
        let mut quiz = QuizSession::new(3).unwrap();
        quiz.toggle_selection("a");
        quiz.go_next();
        quiz.toggle_selection("b");
        quiz.restart();

        assert_eq!(quiz.current_index(), 0);
        assert!(quiz.current_selections().is_empty());
        assert!(quiz.answers().is_blank());
        assert_eq!(quiz.answers().len(), 3);
    }

    #[test]
    fn test_durability_over_long_walk() {
        let mut quiz = QuizSession::new(4).unwrap();
        let picks = ["q0", "q1", "q2"];
        for pick in picks {
            quiz.toggle_selection(pick);
            quiz.go_next();
        }
        for _ in 0..10 {
            quiz.go_back();
        }
        assert_eq!(quiz.current_index(), 0);
        for (index, pick) in picks.iter().enumerate() {
            assert_eq!(quiz.current_index(), index);
            assert_eq!(quiz.current_selections(), &selection(&[pick]));
            quiz.go_next();
        }
        assert_eq!(quiz.current_index(), 3);
    }
}
