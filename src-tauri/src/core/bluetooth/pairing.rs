//! Pairing ceremony state machine.
//!
//! The platform asks for one of four ceremony kinds. Confirm-only and
//! display-PIN are accepted straight away; provide-PIN and confirm-PIN-match
//! suspend on a single-slot future until the UI answers. A new request of a
//! kind abandons the pending one of the same kind, which resolves negatively.

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{info, warn};
use serde::Serialize;
use tokio::sync::oneshot;

use crate::core::bluetooth::events::{BrowserEvent, EventBus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PairingKind {
    ConfirmOnly,
    DisplayPin,
    ProvidePin,
    ConfirmPinMatch,
}

/// A ceremony step requested by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingRequest {
    ConfirmOnly,
    DisplayPin { pin: String },
    ProvidePin,
    ConfirmPinMatch { pin: String },
}

impl PairingRequest {
    pub fn kind(&self) -> PairingKind {
        match self {
            Self::ConfirmOnly => PairingKind::ConfirmOnly,
            Self::DisplayPin { .. } => PairingKind::DisplayPin,
            Self::ProvidePin => PairingKind::ProvidePin,
            Self::ConfirmPinMatch { .. } => PairingKind::ConfirmPinMatch,
        }
    }
}

/// Answer handed back to the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingResponse {
    Accept,
    AcceptWithPin(String),
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CeremonyState {
    AwaitingKind,
    AwaitingUserInput(PairingKind),
    Resolved(PairingResponse),
}

/// What the UI should show for the current ceremony step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingPrompt {
    pub kind: PairingKind,
    pub message: String,
    pub pin: Option<String>,
}

struct Slots {
    state: CeremonyState,
    pin: Option<oneshot::Sender<Option<String>>>,
    confirm: Option<oneshot::Sender<bool>>,
}

/// Drives pairing ceremonies and holds the pending user-input slots.
///
/// Shared outside the manager lock so the UI can answer while a pair request
/// is outstanding.
pub struct PairingCoordinator {
    slots: Mutex<Slots>,
    events: EventBus,
}

impl PairingCoordinator {
    pub fn new(events: EventBus) -> Self {
        Self {
            slots: Mutex::new(Slots {
                state: CeremonyState::AwaitingKind,
                pin: None,
                confirm: None,
            }),
            events,
        }
    }

    pub fn state(&self) -> CeremonyState {
        self.lock().state.clone()
    }

    /// Resets for a new ceremony, abandoning anything still pending.
    pub fn begin(&self) {
        let mut slots = self.lock();
        Self::abandon(&mut slots);
        slots.state = CeremonyState::AwaitingKind;
    }

    /// Answers one ceremony step, waiting for the user where required.
    pub async fn handle(&self, request: PairingRequest) -> PairingResponse {
        info!("Pairing requested: {:?}", request.kind());
        let response = match request {
            PairingRequest::ConfirmOnly => PairingResponse::Accept,
            PairingRequest::DisplayPin { pin } => {
                self.display_pin(pin);
                PairingResponse::Accept
            }
            PairingRequest::ProvidePin => match self.request_pin().await {
                Ok(Some(pin)) if !pin.is_empty() => PairingResponse::AcceptWithPin(pin),
                _ => PairingResponse::Reject,
            },
            PairingRequest::ConfirmPinMatch { pin } => match self.request_confirmation(pin).await {
                Ok(true) => PairingResponse::Accept,
                _ => PairingResponse::Reject,
            },
        };
        self.resolve(response.clone());
        response
    }

    /// Shows a PIN to be typed on the remote device; needs no answer.
    pub fn display_pin(&self, pin: String) {
        self.lock().state = CeremonyState::AwaitingUserInput(PairingKind::DisplayPin);
        self.events.emit(BrowserEvent::PairingPrompt(PairingPrompt {
            kind: PairingKind::DisplayPin,
            message: format!(
                "Please enter this PIN on the device you are pairing with: {}",
                pin
            ),
            pin: Some(pin),
        }));
    }

    /// Opens the PIN-entry slot. A previous unanswered entry resolves to `None`.
    pub fn request_pin(&self) -> oneshot::Receiver<Option<String>> {
        let (tx, rx) = oneshot::channel();
        {
            let mut slots = self.lock();
            if let Some(previous) = slots.pin.take() {
                warn!("Abandoning previous PIN request");
                let _ = previous.send(None);
            }
            slots.pin = Some(tx);
            slots.state = CeremonyState::AwaitingUserInput(PairingKind::ProvidePin);
        }
        self.events.emit(BrowserEvent::PairingPrompt(PairingPrompt {
            kind: PairingKind::ProvidePin,
            message: "Please enter the PIN shown on the device you're pairing with".to_string(),
            pin: None,
        }));
        rx
    }

    /// Opens the PIN-match slot. A previous unanswered match resolves to `false`.
    pub fn request_confirmation(&self, pin: String) -> oneshot::Receiver<bool> {
        let (tx, rx) = oneshot::channel();
        {
            let mut slots = self.lock();
            if let Some(previous) = slots.confirm.take() {
                warn!("Abandoning previous PIN confirmation");
                let _ = previous.send(false);
            }
            slots.confirm = Some(tx);
            slots.state = CeremonyState::AwaitingUserInput(PairingKind::ConfirmPinMatch);
        }
        self.events.emit(BrowserEvent::PairingPrompt(PairingPrompt {
            kind: PairingKind::ConfirmPinMatch,
            message: format!(
                "Does the following PIN match the one shown on the device you are pairing?: {}",
                pin
            ),
            pin: Some(pin),
        }));
        rx
    }

    /// Answers the pending PIN entry. `None` cancels it.
    /// Returns false if nothing was pending.
    pub fn provide_pin(&self, pin: Option<String>) -> bool {
        match self.lock().pin.take() {
            Some(slot) => slot.send(pin).is_ok(),
            None => false,
        }
    }

    /// Answers the pending PIN match. Returns false if nothing was pending.
    pub fn confirm_pin_match(&self, accept: bool) -> bool {
        match self.lock().confirm.take() {
            Some(slot) => slot.send(accept).is_ok(),
            None => false,
        }
    }

    /// Rejects every pending request.
    pub fn cancel(&self) {
        let mut slots = self.lock();
        if Self::abandon(&mut slots) {
            slots.state = CeremonyState::Resolved(PairingResponse::Reject);
        }
    }

    fn resolve(&self, response: PairingResponse) {
        let mut slots = self.lock();
        // A superseded step resolves while its replacement is still waiting.
        if slots.pin.is_none() && slots.confirm.is_none() {
            slots.state = CeremonyState::Resolved(response);
        }
    }

    fn abandon(slots: &mut Slots) -> bool {
        let mut abandoned = false;
        if let Some(slot) = slots.pin.take() {
            let _ = slot.send(None);
            abandoned = true;
        }
        if let Some(slot) = slots.confirm.take() {
            let _ = slot.send(false);
            abandoned = true;
        }
        abandoned
    }

    fn lock(&self) -> MutexGuard<'_, Slots> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn coordinator() -> Arc<PairingCoordinator> {
        Arc::new(PairingCoordinator::new(EventBus::new()))
    }

    #[tokio::test]
    async fn confirm_only_and_display_pin_accept_without_input() {
        let pairing = coordinator();
        assert_eq!(
            pairing.handle(PairingRequest::ConfirmOnly).await,
            PairingResponse::Accept
        );
        assert_eq!(
            pairing
                .handle(PairingRequest::DisplayPin { pin: "123456".into() })
                .await,
            PairingResponse::Accept
        );
        assert_eq!(
            pairing.state(),
            CeremonyState::Resolved(PairingResponse::Accept)
        );
    }

    #[tokio::test]
    async fn second_pin_request_abandons_the_first_exactly_once() {
        let pairing = coordinator();
        let first = pairing.request_pin();
        let second = pairing.request_pin();

        assert_eq!(first.await.unwrap(), None);

        assert!(pairing.provide_pin(Some("4321".into())));
        assert_eq!(second.await.unwrap(), Some("4321".to_string()));
        assert!(!pairing.provide_pin(Some("0000".into())));
    }

    #[tokio::test]
    async fn provide_pin_ceremony_waits_for_the_user() {
        let pairing = coordinator();
        let mut events = pairing.events.subscribe();
        let ceremony = {
            let pairing = pairing.clone();
            tokio::spawn(async move { pairing.handle(PairingRequest::ProvidePin).await })
        };

        match events.recv().await.unwrap() {
            BrowserEvent::PairingPrompt(prompt) => assert_eq!(prompt.kind, PairingKind::ProvidePin),
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(
            pairing.state(),
            CeremonyState::AwaitingUserInput(PairingKind::ProvidePin)
        );
        assert!(pairing.provide_pin(Some("123456".into())));

        assert_eq!(
            ceremony.await.unwrap(),
            PairingResponse::AcceptWithPin("123456".into())
        );
    }

    #[tokio::test]
    async fn empty_pin_rejects() {
        let pairing = coordinator();
        let mut events = pairing.events.subscribe();
        let ceremony = {
            let pairing = pairing.clone();
            tokio::spawn(async move { pairing.handle(PairingRequest::ProvidePin).await })
        };
        events.recv().await.unwrap();
        pairing.provide_pin(Some(String::new()));

        assert_eq!(ceremony.await.unwrap(), PairingResponse::Reject);
    }

    #[tokio::test]
    async fn pin_match_follows_the_user_answer() {
        let pairing = coordinator();
        let mut events = pairing.events.subscribe();
        let ceremony = {
            let pairing = pairing.clone();
            tokio::spawn(async move {
                pairing
                    .handle(PairingRequest::ConfirmPinMatch { pin: "654321".into() })
                    .await
            })
        };
        match events.recv().await.unwrap() {
            BrowserEvent::PairingPrompt(prompt) => assert_eq!(prompt.pin.as_deref(), Some("654321")),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(pairing.confirm_pin_match(false));

        assert_eq!(ceremony.await.unwrap(), PairingResponse::Reject);
    }

    #[tokio::test]
    async fn cancel_rejects_pending_requests() {
        let pairing = coordinator();
        let pin = pairing.request_pin();
        let confirm = pairing.request_confirmation("000000".into());

        pairing.cancel();

        assert_eq!(pin.await.unwrap(), None);
        assert!(!confirm.await.unwrap());
        assert_eq!(
            pairing.state(),
            CeremonyState::Resolved(PairingResponse::Reject)
        );
    }
}
