use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use tokio::sync::OwnedMutexGuard;

use crate::errors::AppError;
use crate::models::{
    BookingRejection, BookingRequest, CallSession, CancelRequest, DialogueIntent, DialogueState,
    Language, PartialReservationSlots, ReservationSlots, RestaurantContext,
};
use crate::services::ai::intent;
use crate::services::escalation::{self, EscalationAction, EscalationTier};
use crate::services::messaging;
use crate::services::safety_net::{self, CorrectedIntent, Correction};
use crate::services::{email, replies, slots, temporal};
use crate::state::AppState;

/// One recognized utterance from the transport.
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub call_id: String,
    pub text: String,
    pub language_hint: Option<String>,
    pub caller: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub reply_text: String,
    pub should_end_call: bool,
    pub language: Language,
    pub intent: DialogueIntent,
    pub slots: ReservationSlots,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tier: Option<EscalationTier>,
}

/// Runs one turn of a call. Always produces something to say: failures become apologies.
pub async fn process_turn(state: &Arc<AppState>, input: TurnInput) -> TurnReply {
    let now = Utc::now().naive_utc();
    let mut session = lock_session(state, &input, now).await;

    if session.is_expired(now) {
        tracing::info!(call_id = %input.call_id, "session expired, starting over");
        *session = new_session(state, &input, now);
    }

    let reply = match run_turn(state, &mut session, &input).await {
        Ok(reply) => reply,
        Err(e) if e.is_fatal() => {
            tracing::error!(call_id = %input.call_id, error = %e, "turn failed, ending call");
            session.state = DialogueState::Closed;
            build_reply(
                &session,
                replies::unavailable(session.language),
                DialogueIntent::NoOp,
                true,
            )
        }
        Err(e) => {
            tracing::error!(call_id = %input.call_id, error = %e, "turn failed");
            session.state = DialogueState::Collecting;
            build_reply(
                &session,
                replies::apology(session.language),
                DialogueIntent::NoOp,
                false,
            )
        }
    };

    session.push_message("assistant", &reply.reply_text);
    session.touch(now, state.sessions.ttl());

    tracing::info!(
        call_id = %session.call_id,
        intent = reply.intent.as_str(),
        state = session.state.as_str(),
        end = reply.should_end_call,
        "turn complete"
    );

    reply
}

/// What to say when the transport has no speech for us: a greeting on a new call, a reprompt
/// afterwards, a goodbye once the call is closed.
pub async fn prompt(
    state: &Arc<AppState>,
    call_id: &str,
    caller: Option<String>,
    language_hint: Option<String>,
) -> TurnReply {
    let now = Utc::now().naive_utc();
    let input = TurnInput {
        call_id: call_id.to_string(),
        text: String::new(),
        language_hint,
        caller,
    };
    let mut session = lock_session(state, &input, now).await;

    if session.is_expired(now) {
        *session = new_session(state, &input, now);
    }

    let language = session.language;
    let reply = if session.state == DialogueState::Closed {
        build_reply(&session, replies::goodbye(language), DialogueIntent::NoOp, true)
    } else if session.messages.is_empty() {
        let text = replies::greeting(language, &session.restaurant.name);
        session.push_message("assistant", &text);
        build_reply(&session, &text, DialogueIntent::NoOp, false)
    } else {
        build_reply(&session, replies::reprompt(language), DialogueIntent::NoOp, false)
    };

    session.touch(now, state.sessions.ttl());
    reply
}

/// Locks the call's session, making sure the locked session is the one the store holds. A purge
/// may drop the entry between lookup and lock.
async fn lock_session(
    state: &AppState,
    input: &TurnInput,
    now: NaiveDateTime,
) -> OwnedMutexGuard<CallSession> {
    loop {
        let shared = state
            .sessions
            .get_or_create(&input.call_id, || new_session(state, input, now));
        let guard = Arc::clone(&shared).lock_owned().await;
        if state.sessions.attach(&input.call_id, &shared) {
            return guard;
        }
        tracing::debug!(call_id = %input.call_id, "session replaced while waiting, retrying");
    }
}

fn new_session(state: &AppState, input: &TurnInput, now: NaiveDateTime) -> CallSession {
    let language = input
        .language_hint
        .as_deref()
        .and_then(Language::from_code)
        .unwrap_or(state.config.default_language);

    CallSession::new(
        &input.call_id,
        input.caller.clone(),
        language,
        RestaurantContext::from_config(&state.config),
        now,
        state.sessions.ttl(),
    )
}

async fn run_turn(
    state: &AppState,
    session: &mut CallSession,
    input: &TurnInput,
) -> Result<TurnReply, AppError> {
    let text = input.text.trim();

    if session.state == DialogueState::Closed {
        return Ok(build_reply(
            session,
            replies::goodbye(session.language),
            DialogueIntent::NoOp,
            true,
        ));
    }

    if let Some(language) = Language::detect_switch(text) {
        if language != session.language {
            tracing::info!(call_id = %session.call_id, language = language.as_str(), "language switched");
            session.language = language;
        }
    }
    session.record_utterance(text);

    if !state.llm.is_configured() {
        return Err(AppError::Config(format!(
            "{} provider has no credentials",
            state.llm.name()
        )));
    }

    let today = Utc::now()
        .with_timezone(&state.config.timezone)
        .date_naive();

    let proposal = match tokio::time::timeout(
        StdDuration::from_secs(state.config.nlu_timeout_secs),
        intent::propose(state.llm.as_ref(), session, today),
    )
    .await
    {
        Ok(Ok(proposal)) => proposal,
        Ok(Err(e)) => {
            tracing::warn!(call_id = %session.call_id, error = %e, "NLU call failed, using fallback");
            intent::fallback(session.language)
        }
        Err(_) => {
            tracing::warn!(call_id = %session.call_id, "NLU call timed out, using fallback");
            intent::fallback(session.language)
        }
    };

    let proposed = reconcile_slots(session, proposal.slots, today, text);
    session.reservation = slots::merge(&session.reservation, &proposed);

    let corrected = safety_net::correct(proposal.intent, &session.reservation, &proposal.reply_text);
    if corrected.rerouted() {
        tracing::warn!(
            call_id = %session.call_id,
            proposed = proposal.intent.as_str(),
            corrected = corrected.intent.as_str(),
            corrections = ?corrected.corrections,
            "intent corrected"
        );
    } else if !corrected.corrections.is_empty() {
        tracing::debug!(call_id = %session.call_id, corrections = ?corrected.corrections, "reply slots cleared");
    }

    match corrected.intent {
        DialogueIntent::FinalizeBooking => finalize(state, session).await,
        DialogueIntent::CancelBooking => cancel(state, session).await,
        intent => {
            session.state = DialogueState::Collecting;
            let language = session.language;
            let canned = replies::question_for(intent, language);
            let reply_text = if uses_canned_question(&corrected) || proposal.reply_text.trim().is_empty() {
                canned
                    .map(str::to_string)
                    .unwrap_or_else(|| replies::please_repeat(language).to_string())
            } else {
                proposal.reply_text
            };

            let mut reply = build_reply(session, &reply_text, intent, false);
            reply.slots = corrected.reply_slots;
            Ok(reply)
        }
    }
}

/// Fills in what the model missed from the utterances themselves.
fn reconcile_slots(
    session: &CallSession,
    mut proposed: PartialReservationSlots,
    today: NaiveDate,
    latest: &str,
) -> PartialReservationSlots {
    let history = &session.utterance_history;

    // Once a date is held, only the latest utterance may move it.
    let date_history = if session.reservation.date.is_some() {
        &history[history.len().saturating_sub(1)..]
    } else {
        &history[..]
    };
    proposed.date = temporal::resolve(date_history, today, proposed.date);

    if proposed.time.is_none() && session.reservation.time.is_none() {
        proposed.time = temporal::infer_time(history, &session.restaurant.time_defaults);
    }

    proposed.customer_email = proposed
        .customer_email
        .as_deref()
        .and_then(email::normalize)
        .or_else(|| {
            email::extract(latest)
                .map(|e| email::sanitize(&e))
                .filter(|e| email::is_valid(e))
        });

    proposed
}

/// The model's wording no longer matches the corrected intent: it asked the wrong question or
/// announced a booking that was not made.
fn uses_canned_question(corrected: &CorrectedIntent) -> bool {
    corrected.corrections.iter().any(|c| {
        matches!(
            c,
            Correction::NameAlreadyKnown
                | Correction::FinalizeMissing(_)
                | Correction::FinalizeStillAsking
        )
    })
}

async fn finalize(state: &AppState, session: &mut CallSession) -> Result<TurnReply, AppError> {
    session.state = DialogueState::Finalizing;
    let language = session.language;
    let slots = session.reservation.clone();
    let tier = escalation::classify(slots.party_size, &session.restaurant.thresholds);
    let action = tier.action();

    tracing::info!(
        call_id = %session.call_id,
        tier = tier.as_str(),
        party_size = ?slots.party_size,
        "finalizing booking"
    );

    if action == EscalationAction::NotifyOwnerOnly {
        notify_owner(state, tier, &slots, session.caller.as_deref()).await;
        let contact = &session.restaurant.contact_email;
        let spoken = (!contact.is_empty()).then(|| email::render(contact, language));

        session.state = DialogueState::Closed;
        let mut reply = build_reply(
            session,
            &replies::private_event(language, spoken.as_deref()),
            DialogueIntent::FinalizeBooking,
            true,
        );
        reply.tier = Some(tier);
        return Ok(reply);
    }

    let (Some(date), Some(time), Some(name)) = (slots.date, slots.time, slots.customer_name.clone())
    else {
        session.state = DialogueState::Collecting;
        let intent = slots
            .first_missing_required()
            .map(safety_net::ask_for)
            .unwrap_or(DialogueIntent::NoOp);
        let text = replies::question_for(intent, language).unwrap_or(replies::please_repeat(language));
        return Ok(build_reply(session, text, intent, false));
    };

    let request = BookingRequest {
        customer_name: name,
        party_size: slots.party_size,
        date,
        time,
        caller_identifier: session.caller.clone(),
        customer_email: slots.customer_email.clone(),
        requires_confirmation: action == EscalationAction::BookPendingConfirmation,
    };

    let outcome = match tokio::time::timeout(
        StdDuration::from_secs(state.config.booking_timeout_secs),
        state.booking.create(&request),
    )
    .await
    {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            tracing::error!(call_id = %session.call_id, backend = state.booking.name(), error = %e, "booking failed");
            return Ok(retry_time(session));
        }
        Err(_) => {
            tracing::error!(call_id = %session.call_id, backend = state.booking.name(), "booking timed out");
            return Ok(retry_time(session));
        }
    };

    if !outcome.success {
        session.state = DialogueState::Collecting;
        return Ok(match outcome.reason {
            Some(BookingRejection::SlotFull) => {
                tracing::warn!(call_id = %session.call_id, date = %date, time = %time, "slot full");
                build_reply(
                    session,
                    &replies::slot_full(language, &slots),
                    DialogueIntent::AskTime,
                    false,
                )
            }
            reason => {
                tracing::warn!(call_id = %session.call_id, reason = ?reason, "booking rejected");
                retry_time(session)
            }
        });
    }

    let text = if action == EscalationAction::BookPendingConfirmation {
        notify_owner(state, tier, &slots, session.caller.as_deref()).await;
        replies::pending_confirmation(language, &slots)
    } else {
        replies::booking_confirmed(language, &slots)
    };

    session.state = DialogueState::Closed;
    let mut reply = build_reply(session, &text, DialogueIntent::FinalizeBooking, true);
    reply.tier = Some(tier);
    Ok(reply)
}

async fn cancel(state: &AppState, session: &mut CallSession) -> Result<TurnReply, AppError> {
    let language = session.language;

    let Some(date) = session.reservation.date else {
        session.state = DialogueState::Collecting;
        let text = replies::question_for(DialogueIntent::AskDate, language)
            .unwrap_or(replies::please_repeat(language));
        return Ok(build_reply(session, text, DialogueIntent::AskDate, false));
    };

    session.state = DialogueState::Finalizing;
    let request = CancelRequest {
        customer_name: session.reservation.customer_name.clone(),
        date,
        time: session.reservation.time,
        caller_identifier: session.caller.clone(),
    };

    let outcome = match tokio::time::timeout(
        StdDuration::from_secs(state.config.booking_timeout_secs),
        state.booking.cancel(&request),
    )
    .await
    {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(e)) => {
            return Err(AppError::Booking(e.to_string()));
        }
        Err(_) => {
            return Err(AppError::Booking("cancel timed out".to_string()));
        }
    };

    if outcome.success {
        tracing::info!(call_id = %session.call_id, date = %date, "booking cancelled");
        session.state = DialogueState::Closed;
        return Ok(build_reply(
            session,
            &replies::cancelled(language, date),
            DialogueIntent::CancelBooking,
            true,
        ));
    }

    tracing::warn!(call_id = %session.call_id, reason = ?outcome.reason, "cancel rejected");
    session.state = DialogueState::Collecting;
    Ok(build_reply(
        session,
        replies::cancel_not_found(language),
        DialogueIntent::CancelBooking,
        false,
    ))
}

/// Apology after a failed booking attempt; the call stays open for another time.
fn retry_time(session: &mut CallSession) -> TurnReply {
    session.state = DialogueState::Collecting;
    build_reply(
        session,
        replies::apology(session.language),
        DialogueIntent::AskTime,
        false,
    )
}

async fn notify_owner(
    state: &AppState,
    tier: EscalationTier,
    slots: &ReservationSlots,
    caller: Option<&str>,
) {
    let owner = state.config.owner_phone.trim();
    if owner.is_empty() {
        tracing::warn!(tier = tier.as_str(), "no owner phone configured, skipping notification");
        return;
    }

    let body = messaging::owner_alert(tier, slots, caller);
    if let Err(e) = state.messaging.send_message(owner, &body).await {
        tracing::error!(error = %e, tier = tier.as_str(), "failed to notify owner");
    }
}

fn build_reply(
    session: &CallSession,
    text: &str,
    intent: DialogueIntent,
    should_end_call: bool,
) -> TurnReply {
    TurnReply {
        reply_text: text.to_string(),
        should_end_call,
        language: session.language,
        intent,
        slots: session.reservation.clone(),
        tier: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session() -> CallSession {
        let restaurant = RestaurantContext {
            name: "Test".to_string(),
            contact_email: String::new(),
            thresholds: Default::default(),
            time_defaults: Default::default(),
        };
        CallSession::new(
            "CA1",
            None,
            Language::En,
            restaurant,
            Utc::now().naive_utc(),
            Duration::minutes(30),
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
    }

    #[test]
    fn test_reconcile_fills_date_and_time_from_history() {
        let mut s = session();
        s.record_utterance("A table for 4 tomorrow evening, I'm Marco");
        let text = s.utterance_history[0].clone();

        let out = reconcile_slots(&s, PartialReservationSlots::default(), today(), &text);
        assert_eq!(out.date, NaiveDate::from_ymd_opt(2025, 6, 11));
        assert_eq!(out.time, chrono::NaiveTime::from_hms_opt(20, 0, 0));
    }

    #[test]
    fn test_reconcile_takes_spelled_out_date_correction() {
        let mut s = session();
        s.record_utterance("a table for tomorrow");
        s.reservation.date = NaiveDate::from_ymd_opt(2025, 6, 11);
        s.record_utterance("no sorry, I meant June 20th");

        let proposed = PartialReservationSlots {
            date: NaiveDate::from_ymd_opt(2025, 6, 20),
            ..Default::default()
        };
        let out = reconcile_slots(&s, proposed, today(), "no sorry, I meant June 20th");
        assert_eq!(out.date, NaiveDate::from_ymd_opt(2025, 6, 20));

        // The corrected date is not pulled back by the old expression on later turns.
        s.reservation.date = out.date;
        s.record_utterance("I'm Marco");
        let out = reconcile_slots(&s, PartialReservationSlots::default(), today(), "I'm Marco");
        assert_eq!(out.date, None);
        assert_eq!(
            slots::merge(&s.reservation, &out).date,
            NaiveDate::from_ymd_opt(2025, 6, 20)
        );
    }

    #[test]
    fn test_reconcile_ignores_weekday_name() {
        let mut s = session();
        let said = "buonasera, sono Domenica Rossi";
        s.record_utterance(said);

        let proposed = PartialReservationSlots {
            date: NaiveDate::from_ymd_opt(2025, 6, 20),
            customer_name: Some("Domenica Rossi".to_string()),
            ..Default::default()
        };
        let out = reconcile_slots(&s, proposed, today(), said);
        assert_eq!(out.date, NaiveDate::from_ymd_opt(2025, 6, 20));
    }

    #[test]
    fn test_reconcile_keeps_known_time() {
        let mut s = session();
        s.reservation.time = chrono::NaiveTime::from_hms_opt(19, 30, 0);
        s.record_utterance("tonight please");

        let out = reconcile_slots(&s, PartialReservationSlots::default(), today(), "tonight please");
        assert_eq!(out.time, None);
    }

    #[test]
    fn test_reconcile_email_from_utterance() {
        let mut s = session();
        let said = "it's mirko13 at gmail dot com";
        s.record_utterance(said);

        let out = reconcile_slots(&s, PartialReservationSlots::default(), today(), said);
        assert_eq!(out.customer_email.as_deref(), Some("mirko13@gmail.com"));
    }

    #[test]
    fn test_reconcile_drops_invalid_model_email() {
        let s = session();
        let proposed = PartialReservationSlots {
            customer_email: Some("not an address".to_string()),
            ..Default::default()
        };
        let out = reconcile_slots(&s, proposed, today(), "no thanks");
        assert_eq!(out.customer_email, None);
    }

    #[test]
    fn test_canned_question_when_model_wording_is_wrong() {
        let slots = ReservationSlots {
            customer_name: Some("Marco".to_string()),
            ..Default::default()
        };
        let corrected = safety_net::correct(DialogueIntent::AskName, &slots, "Your name?");
        assert!(uses_canned_question(&corrected));

        let corrected =
            safety_net::correct(DialogueIntent::AnswerInformational, &slots, "We open at 7.");
        assert!(!uses_canned_question(&corrected));

        let complete = ReservationSlots {
            date: NaiveDate::from_ymd_opt(2025, 6, 11),
            time: chrono::NaiveTime::from_hms_opt(20, 0, 0),
            ..slots
        };
        let corrected = safety_net::correct(
            DialogueIntent::FinalizeBooking,
            &complete,
            "Booked for tomorrow! Would you also like a reminder?",
        );
        assert_eq!(corrected.intent, DialogueIntent::AskTime);
        assert!(uses_canned_question(&corrected));
    }
}
