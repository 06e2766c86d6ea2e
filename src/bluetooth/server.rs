use embassy_sync::blocking_mutex::raw::RawMutex;
use log::*;

use super::advertising::{
    AdvertisingController, ConfigProgress, ADV_CONFIG_FLAG, SCAN_RSP_CONFIG_FLAG,
};
use super::connection;
use super::events::{GapEvent, GattStatus, GattsEvent, StackEvent};
use super::responder;
use super::setup::{Completion, SetupAction, SetupSequencer, SetupState};
use super::stack::{GattStack, PERM_READ, PERM_WRITE, PROP_NOTIFY, PROP_READ};
use crate::config::{GattServerConfig, CLIENT_CHARACTERISTIC_CONFIG};
use crate::errors::SetupError;
use crate::led::{Feedback, SharedFeedback};
use crate::state::SharedState;

pub struct GattServer<'a, M: RawMutex, F: Feedback> {
    config: GattServerConfig,
    shared: &'a SharedState<M>,
    feedback: &'a SharedFeedback<M, F>,
    setup: SetupSequencer,
    advertising: AdvertisingController,
}

impl<'a, M: RawMutex, F: Feedback> GattServer<'a, M, F> {
    pub fn new(
        config: GattServerConfig,
        shared: &'a SharedState<M>,
        feedback: &'a SharedFeedback<M, F>,
    ) -> Self {
        Self {
            setup: SetupSequencer::new(),
            advertising: AdvertisingController::new(config.adv_params),
            config,
            shared,
            feedback,
        }
    }

    pub fn setup_state(&self) -> SetupState {
        self.setup.state()
    }

    pub fn setup_error(&self) -> Option<SetupError> {
        self.setup.halted()
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising.is_advertising()
    }

    pub fn start<S: GattStack>(&mut self, stack: &mut S) {
        self.setup.start(stack, self.config.app_id);
        if self.setup.state() != SetupState::Registering {
            return;
        }
        if let Err(e) = stack.set_local_mtu(self.config.local_mtu) {
            warn!("[Server] Set local MTU failed: {:?}", e);
        }
    }

    pub fn dispatch<S: GattStack>(&mut self, stack: &mut S, event: StackEvent<'_>) {
        match event {
            StackEvent::Gap(event) => self.handle_gap_event(stack, event),
            StackEvent::Gatts(event) => self.handle_gatts_event(stack, event),
        }
    }

    pub fn handle_gap_event<S: GattStack>(&mut self, stack: &mut S, event: GapEvent) {
        match event {
            GapEvent::AdvDataSetComplete { status } => {
                info!("[Server] Adv data set complete, status={:?}", status);
                self.on_adv_config(stack, ADV_CONFIG_FLAG, status);
            }
            GapEvent::ScanRspDataSetComplete { status } => {
                info!("[Server] Scan rsp data set complete, status={:?}", status);
                self.on_adv_config(stack, SCAN_RSP_CONFIG_FLAG, status);
            }
            GapEvent::AdvStartComplete { status } => {
                self.advertising.on_start_complete(status);
            }
        }
    }

    pub fn handle_gatts_event<S: GattStack>(&mut self, stack: &mut S, event: GattsEvent<'_>) {
        match event {
            GattsEvent::Registered { status, app_id } => {
                if app_id != self.config.app_id {
                    warn!("[Server] Registration for unknown app {}, ignoring", app_id);
                    return;
                }
                self.advance(stack, Completion::Registered, status);
            }
            GattsEvent::ServiceCreated {
                status,
                service_handle,
            } => self.advance(stack, Completion::ServiceCreated(service_handle), status),
            GattsEvent::ServiceStarted {
                status,
                service_handle,
            } => self.advance(stack, Completion::ServiceStarted(service_handle), status),
            GattsEvent::CharacteristicAdded {
                status,
                attr_handle,
            } => self.advance(stack, Completion::CharacteristicAdded(attr_handle), status),
            GattsEvent::DescriptorAdded {
                status,
                attr_handle,
            } => self.advance(stack, Completion::DescriptorAdded(attr_handle), status),
            GattsEvent::Connect { conn_id, remote } => {
                self.advertising.on_connected();
                connection::on_connect(self.shared, conn_id, remote);
            }
            GattsEvent::Disconnect {
                conn_id,
                remote,
                reason,
            } => {
                if connection::on_disconnect(self.shared, conn_id, remote, reason) {
                    self.advertising.restart(stack);
                    self.feedback.set_idle();
                }
            }
            GattsEvent::Read {
                conn_id,
                trans_id,
                handle,
            } => responder::on_read(self.shared, stack, conn_id, trans_id, handle),
            GattsEvent::Write {
                conn_id,
                trans_id,
                handle,
                value,
                need_rsp,
            } => {
                let is_cccd = self.shared.handles().is_some_and(|h| h.cccd == handle);
                if is_cccd {
                    connection::on_cccd_write(
                        self.shared,
                        stack,
                        conn_id,
                        trans_id,
                        value,
                        need_rsp,
                    );
                } else {
                    responder::on_write(stack, conn_id, trans_id, handle, value, need_rsp);
                }
            }
        }
    }

    fn on_adv_config<S: GattStack>(&mut self, stack: &mut S, flag: u8, status: GattStatus) {
        if self.advertising.on_config_complete(stack, flag, status) == ConfigProgress::Complete {
            // A failed configuration only halts advertising, not the service branch.
            self.advance(stack, Completion::AdvertisingConfigured, GattStatus::Ok);
        }
    }

    fn advance<S: GattStack>(&mut self, stack: &mut S, completion: Completion, status: GattStatus) {
        if let Some(action) = self.setup.complete(completion, status) {
            self.perform(stack, action);
        }
    }

    fn perform<S: GattStack>(&mut self, stack: &mut S, action: SetupAction) {
        let config = self.config;
        let result = match action {
            SetupAction::ConfigureAdvertising => self.advertising.configure(
                stack,
                &config.adv_data,
                config.scan_rsp_data.as_ref(),
            ),
            SetupAction::CreateService => {
                stack.create_service(config.service_uuid, config.num_handles)
            }
            SetupAction::StartService(service) => stack.start_service(service),
            SetupAction::AddCharacteristic(service) => stack.add_characteristic(
                service,
                config.characteristic_uuid,
                PERM_READ,
                PROP_READ | PROP_NOTIFY,
                &self.shared.value(),
            ),
            SetupAction::AddDescriptor(service) => stack.add_descriptor(
                service,
                CLIENT_CHARACTERISTIC_CONFIG,
                PERM_READ | PERM_WRITE,
            ),
            SetupAction::MarkReady(handles) => {
                if self.shared.mark_ready(handles) {
                    info!(
                        "[Server] Ready: service={} characteristic={} cccd={}",
                        handles.service.0, handles.characteristic.0, handles.cccd.0
                    );
                }
                Ok(())
            }
        };

        if let Err(e) = result {
            error!("[Server] {:?} command failed: {:?}", action, e);
            if let Some(step) = action.step() {
                self.setup.reject(step);
            }
        }
    }
}
