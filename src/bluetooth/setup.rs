use log::*;

use super::events::{AttHandle, GattStatus};
use super::stack::GattStack;
use crate::errors::SetupError;
use crate::state::AttributeHandles;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupState {
    Unregistered,
    Registering,
    ConfiguringAdvertising,
    CreatingService,
    StartingService { service: AttHandle },
    AddingCharacteristic { service: AttHandle },
    AddingDescriptor { service: AttHandle, characteristic: AttHandle },
    Ready(AttributeHandles),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupStep {
    Register,
    ConfigureAdvertising,
    CreateService,
    StartService,
    AddCharacteristic,
    AddDescriptor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Registered,
    AdvertisingConfigured,
    ServiceCreated(AttHandle),
    ServiceStarted(AttHandle),
    CharacteristicAdded(AttHandle),
    DescriptorAdded(AttHandle),
}

impl Completion {
    pub fn step(&self) -> SetupStep {
        match self {
            Completion::Registered => SetupStep::Register,
            Completion::AdvertisingConfigured => SetupStep::ConfigureAdvertising,
            Completion::ServiceCreated(_) => SetupStep::CreateService,
            Completion::ServiceStarted(_) => SetupStep::StartService,
            Completion::CharacteristicAdded(_) => SetupStep::AddCharacteristic,
            Completion::DescriptorAdded(_) => SetupStep::AddDescriptor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupAction {
    ConfigureAdvertising,
    CreateService,
    StartService(AttHandle),
    AddCharacteristic(AttHandle),
    AddDescriptor(AttHandle),
    MarkReady(AttributeHandles),
}

impl SetupAction {
    pub fn step(&self) -> Option<SetupStep> {
        match self {
            SetupAction::ConfigureAdvertising => Some(SetupStep::ConfigureAdvertising),
            SetupAction::CreateService => Some(SetupStep::CreateService),
            SetupAction::StartService(_) => Some(SetupStep::StartService),
            SetupAction::AddCharacteristic(_) => Some(SetupStep::AddCharacteristic),
            SetupAction::AddDescriptor(_) => Some(SetupStep::AddDescriptor),
            SetupAction::MarkReady(_) => None,
        }
    }
}

impl SetupState {
    /// Transition table. `None` means the completion is not expected here.
    pub fn on_completion(self, completion: Completion) -> Option<(SetupState, SetupAction)> {
        use Completion as C;
        use SetupState as S;

        let next = match (self, completion) {
            (S::Registering, C::Registered) => {
                (S::ConfiguringAdvertising, SetupAction::ConfigureAdvertising)
            }
            (S::ConfiguringAdvertising, C::AdvertisingConfigured) => {
                (S::CreatingService, SetupAction::CreateService)
            }
            (S::CreatingService, C::ServiceCreated(service)) => (
                S::StartingService { service },
                SetupAction::StartService(service),
            ),
            (S::StartingService { service }, C::ServiceStarted(started)) if started == service => (
                S::AddingCharacteristic { service },
                SetupAction::AddCharacteristic(service),
            ),
            (S::AddingCharacteristic { service }, C::CharacteristicAdded(characteristic)) => (
                S::AddingDescriptor {
                    service,
                    characteristic,
                },
                SetupAction::AddDescriptor(service),
            ),
            (
                S::AddingDescriptor {
                    service,
                    characteristic,
                },
                C::DescriptorAdded(cccd),
            ) => {
                let handles = AttributeHandles {
                    service,
                    characteristic,
                    cccd,
                };
                (S::Ready(handles), SetupAction::MarkReady(handles))
            }
            _ => return None,
        };
        Some(next)
    }
}

pub struct SetupSequencer {
    state: SetupState,
    halted: Option<SetupError>,
}

impl SetupSequencer {
    pub const fn new() -> Self {
        Self {
            state: SetupState::Unregistered,
            halted: None,
        }
    }

    pub fn state(&self) -> SetupState {
        self.state
    }

    pub fn halted(&self) -> Option<SetupError> {
        self.halted
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, SetupState::Ready(_))
    }

    pub fn start<S: GattStack>(&mut self, stack: &mut S, app_id: u16) {
        if self.state != SetupState::Unregistered || self.halted.is_some() {
            warn!("[Setup] Start requested in state {:?}, ignoring", self.state);
            return;
        }
        match stack.register_app(app_id) {
            Ok(()) => {
                info!("[Setup] Registering application {}", app_id);
                self.state = SetupState::Registering;
            }
            Err(e) => {
                error!("[Setup] App register error: {:?}", e);
                self.halt(SetupError::CommandRejected(SetupStep::Register));
            }
        }
    }

    /// Feeds a completion through the transition table.
    ///
    /// Returns the action the caller must carry out, if any. A non-success
    /// status halts the sequence.
    pub fn complete(
        &mut self,
        completion: Completion,
        status: GattStatus,
    ) -> Option<SetupAction> {
        if let Some(reason) = self.halted {
            debug!("[Setup] Halted ({}), dropping {:?}", reason, completion);
            return None;
        }

        if !status.is_ok() {
            error!(
                "[Setup] {:?} failed with status {:?} in state {:?}",
                completion.step(),
                status,
                self.state
            );
            self.halt(SetupError::CompletionFailed(completion.step(), status));
            return None;
        }

        match self.state.on_completion(completion) {
            Some((next, action)) => {
                info!("[Setup] {:?} -> {:?}", self.state, next);
                self.state = next;
                Some(action)
            }
            None => {
                warn!(
                    "[Setup] Unexpected completion {:?} in state {:?}",
                    completion, self.state
                );
                None
            }
        }
    }

    pub fn reject(&mut self, step: SetupStep) {
        self.halt(SetupError::CommandRejected(step));
    }

    fn halt(&mut self, reason: SetupError) {
        if self.halted.is_none() {
            error!("[Setup] Setup halted: {}", reason);
            self.halted = Some(reason);
        }
    }
}

impl Default for SetupSequencer {
    fn default() -> Self {
        Self::new()
    }
}
