//! Round and question resolution against the durable store.
//!
//! Questions are addressed by `(round, position)` rather than by raw id so
//! reordering or deactivating questions never desynchronizes the host and
//! the coordinator: the position always counts active questions only, in
//! `round_index` order.

use crate::{
    dao::models::{QuestionEntity, RoundEntity},
    error::ServiceError,
    state::SharedState,
};

/// All rounds in canonical order.
pub async fn rounds_ordered(state: &SharedState) -> Result<Vec<RoundEntity>, ServiceError> {
    let store = state.require_store().await?;
    Ok(store.list_rounds().await?)
}

/// One round by id, or [`ServiceError::NotFound`].
pub async fn round_by_id(state: &SharedState, round_id: &str) -> Result<RoundEntity, ServiceError> {
    let store = state.require_store().await?;
    store
        .find_round(round_id.to_owned())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("round `{round_id}` not found")))
}

/// Active questions of a round in presentation order.
pub async fn questions_in_round(
    state: &SharedState,
    round_id: &str,
) -> Result<Vec<QuestionEntity>, ServiceError> {
    let store = state.require_store().await?;
    Ok(store.list_questions(round_id.to_owned()).await?)
}

/// The question at a 1-based position within a round, counting active
/// questions only.
pub async fn question_at(
    state: &SharedState,
    round_id: &str,
    position: u32,
) -> Result<QuestionEntity, ServiceError> {
    if position == 0 {
        return Err(ServiceError::InvalidInput(
            "question position is 1-based".into(),
        ));
    }
    let questions = questions_in_round(state, round_id).await?;
    questions
        .into_iter()
        .nth((position - 1) as usize)
        .ok_or_else(|| {
            ServiceError::NotFound(format!(
                "round `{round_id}` has no question at position {position}"
            ))
        })
}

/// One question by id regardless of its active flag, answer key included.
pub async fn question_by_id(
    state: &SharedState,
    question_id: &str,
) -> Result<QuestionEntity, ServiceError> {
    let store = state.require_store().await?;
    store
        .find_question(question_id.to_owned())
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("question `{question_id}` not found")))
}

/// Number of active questions, optionally narrowed to one round.
pub async fn count_questions(
    state: &SharedState,
    round_id: Option<&str>,
) -> Result<u64, ServiceError> {
    let store = state.require_store().await?;
    Ok(store
        .count_questions(round_id.map(str::to_owned))
        .await?)
}

/// Make `round_id` the single active round. The two writes are ordered so a
/// crash in between leaves zero active rounds rather than two.
pub async fn activate_round(state: &SharedState, round_id: &str) -> Result<(), ServiceError> {
    let store = state.require_store().await?;
    if store.find_round(round_id.to_owned()).await?.is_none() {
        return Err(ServiceError::NotFound(format!(
            "round `{round_id}` not found"
        )));
    }
    store.deactivate_all_rounds().await?;
    store.set_round_active(round_id.to_owned(), true).await?;
    Ok(())
}

/// Resolve the answer key of a question to one comparable literal.
///
/// Single-answer questions resolve to the indexed choice; multi-answer
/// questions join every correct choice with `", "` in choice order.
pub fn resolve_correct_answer(question: &QuestionEntity) -> Result<String, ServiceError> {
    if let Some(index) = question.correct_index {
        return question.choices.get(index).cloned().ok_or_else(|| {
            ServiceError::InvalidState(format!(
                "question `{}` has correct_index {} but only {} choices",
                question.id,
                index,
                question.choices.len()
            ))
        });
    }

    if let Some(indices) = &question.correct_answers {
        if indices.is_empty() {
            return Err(ServiceError::InvalidState(format!(
                "question `{}` has an empty correct_answers list",
                question.id
            )));
        }
        let mut parts = Vec::with_capacity(indices.len());
        for &index in indices {
            let choice = question.choices.get(index).ok_or_else(|| {
                ServiceError::InvalidState(format!(
                    "question `{}` references choice {} out of {}",
                    question.id,
                    index,
                    question.choices.len()
                ))
            })?;
            parts.push(choice.clone());
        }
        return Ok(parts.join(", "));
    }

    Err(ServiceError::InvalidState(format!(
        "question `{}` has no answer key",
        question.id
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(correct_index: Option<usize>, correct_answers: Option<Vec<usize>>) -> QuestionEntity {
        QuestionEntity {
            id: "q1".into(),
            text: "Which of these are primary colors?".into(),
            choices: vec!["Red".into(), "Green".into(), "Blue".into(), "Pink".into()],
            correct_index,
            correct_answers,
            time_limit: 30,
            points: 100,
            is_active: true,
            round_id: "round-a".into(),
            round_index: 1,
        }
    }

    #[test]
    fn single_answer_resolves_to_the_indexed_choice() {
        let q = question(Some(2), None);
        assert_eq!(resolve_correct_answer(&q).unwrap(), "Blue");
    }

    #[test]
    fn multi_answer_joins_choices_in_order() {
        let q = question(None, Some(vec![0, 2]));
        assert_eq!(resolve_correct_answer(&q).unwrap(), "Red, Blue");
    }

    #[test]
    fn out_of_range_answer_keys_are_rejected() {
        assert!(resolve_correct_answer(&question(Some(9), None)).is_err());
        assert!(resolve_correct_answer(&question(None, Some(vec![0, 9]))).is_err());
        assert!(resolve_correct_answer(&question(None, Some(vec![]))).is_err());
        assert!(resolve_correct_answer(&question(None, None)).is_err());
    }
}
