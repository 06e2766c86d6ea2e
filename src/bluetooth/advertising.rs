use log::*;

use super::events::GattStatus;
use super::stack::{AdvertisingData, AdvertisingParams, GattStack};

pub const ADV_CONFIG_FLAG: u8 = 1 << 0;
pub const SCAN_RSP_CONFIG_FLAG: u8 = 1 << 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigProgress {
    /// Other configuration completions are still outstanding.
    Pending,
    /// Every outstanding configuration completed.
    Complete,
    /// Nothing was outstanding for this completion.
    Unexpected,
}

pub struct AdvertisingController {
    params: AdvertisingParams,
    pending: u8,
    failed: bool,
    advertising: bool,
}

impl AdvertisingController {
    pub const fn new(params: AdvertisingParams) -> Self {
        Self {
            params,
            pending: 0,
            failed: false,
            advertising: false,
        }
    }

    pub fn pending(&self) -> u8 {
        self.pending
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Issues the advertising and optional scan-response configuration.
    /// A rejected command is returned and leaves nothing to wait for.
    pub fn configure<S: GattStack>(
        &mut self,
        stack: &mut S,
        adv_data: &AdvertisingData,
        scan_rsp_data: Option<&AdvertisingData>,
    ) -> Result<(), S::Error> {
        // Mark every bit before issuing anything: a fast stack may
        // complete the first command before the second is issued.
        self.pending = ADV_CONFIG_FLAG;
        if scan_rsp_data.is_some() {
            self.pending |= SCAN_RSP_CONFIG_FLAG;
        }

        let result = stack.config_adv_data(adv_data).and_then(|()| match scan_rsp_data {
            Some(data) => stack.config_scan_rsp_data(data),
            None => Ok(()),
        });
        if let Err(e) = &result {
            error!("[Advertising] Advertising configuration rejected: {:?}", e);
            self.pending = 0;
            self.failed = true;
        }
        result
    }

    /// Clears `flag` and starts advertising once the mask is empty.
    pub fn on_config_complete<S: GattStack>(
        &mut self,
        stack: &mut S,
        flag: u8,
        status: GattStatus,
    ) -> ConfigProgress {
        if self.pending & flag == 0 {
            warn!("[Advertising] Unexpected config completion {:#04x}", flag);
            return ConfigProgress::Unexpected;
        }

        self.pending &= !flag;
        if !status.is_ok() {
            error!(
                "[Advertising] Config {:#04x} failed, status={:?}",
                flag, status
            );
            self.failed = true;
        }

        if self.pending != 0 {
            return ConfigProgress::Pending;
        }

        if self.failed {
            error!("[Advertising] Configuration incomplete, not advertising");
        } else {
            self.start(stack);
        }
        ConfigProgress::Complete
    }

    pub fn on_start_complete(&mut self, status: GattStatus) {
        if status.is_ok() {
            info!("[Advertising] Advertising started");
            self.advertising = true;
        } else {
            error!("[Advertising] Adv start failed, status={:?}", status);
            self.advertising = false;
        }
    }

    pub fn on_connected(&mut self) {
        self.advertising = false;
    }

    /// Restarts advertising after a disconnect. Configuration does not
    /// change after first set-up, so there is no mask to wait for.
    pub fn restart<S: GattStack>(&mut self, stack: &mut S) {
        self.start(stack);
    }

    fn start<S: GattStack>(&mut self, stack: &mut S) {
        if let Err(e) = stack.start_advertising(&self.params) {
            error!("[Advertising] Start advertising failed: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bluetooth::{AttHandle, ConnId, TransId};
    use crate::config::{ADV_DATA, ADV_PARAMS};
    use crate::payload::PAYLOAD_LEN;

    #[derive(Default)]
    struct CountingStack {
        configs: usize,
        scan_configs: usize,
        starts: usize,
        reject_scan_rsp: bool,
    }

    impl GattStack for CountingStack {
        type Error = ();

        fn register_app(&mut self, _: u16) -> Result<(), ()> {
            Ok(())
        }
        fn set_local_mtu(&mut self, _: u16) -> Result<(), ()> {
            Ok(())
        }
        fn config_adv_data(&mut self, _: &AdvertisingData) -> Result<(), ()> {
            self.configs += 1;
            Ok(())
        }
        fn config_scan_rsp_data(&mut self, _: &AdvertisingData) -> Result<(), ()> {
            if self.reject_scan_rsp {
                return Err(());
            }
            self.scan_configs += 1;
            Ok(())
        }
        fn start_advertising(&mut self, _: &AdvertisingParams) -> Result<(), ()> {
            self.starts += 1;
            Ok(())
        }
        fn create_service(&mut self, _: u16, _: u16) -> Result<(), ()> {
            Ok(())
        }
        fn start_service(&mut self, _: AttHandle) -> Result<(), ()> {
            Ok(())
        }
        fn add_characteristic(
            &mut self,
            _: AttHandle,
            _: u128,
            _: u8,
            _: u8,
            _: &[u8; PAYLOAD_LEN],
        ) -> Result<(), ()> {
            Ok(())
        }
        fn add_descriptor(&mut self, _: AttHandle, _: u16, _: u8) -> Result<(), ()> {
            Ok(())
        }
        fn send_response(
            &mut self,
            _: ConnId,
            _: TransId,
            _: GattStatus,
            _: Option<&[u8]>,
        ) -> Result<(), ()> {
            Ok(())
        }
    }

    #[test]
    fn waits_for_every_config_completion() {
        let mut stack = CountingStack::default();
        let mut adv = AdvertisingController::new(ADV_PARAMS);
        let scan_rsp = AdvertisingData {
            set_scan_rsp: true,
            ..ADV_DATA
        };

        assert!(adv.configure(&mut stack, &ADV_DATA, Some(&scan_rsp)).is_ok());
        assert_eq!(adv.pending(), ADV_CONFIG_FLAG | SCAN_RSP_CONFIG_FLAG);
        assert_eq!((stack.configs, stack.scan_configs), (1, 1));

        assert_eq!(
            adv.on_config_complete(&mut stack, SCAN_RSP_CONFIG_FLAG, GattStatus::Ok),
            ConfigProgress::Pending
        );
        assert_eq!(stack.starts, 0);

        assert_eq!(
            adv.on_config_complete(&mut stack, ADV_CONFIG_FLAG, GattStatus::Ok),
            ConfigProgress::Complete
        );
        assert_eq!(stack.starts, 1);

        adv.on_start_complete(GattStatus::Ok);
        assert!(adv.is_advertising());
    }

    #[test]
    fn duplicate_completion_is_unexpected() {
        let mut stack = CountingStack::default();
        let mut adv = AdvertisingController::new(ADV_PARAMS);
        adv.configure(&mut stack, &ADV_DATA, None).unwrap();

        adv.on_config_complete(&mut stack, ADV_CONFIG_FLAG, GattStatus::Ok);
        assert_eq!(
            adv.on_config_complete(&mut stack, ADV_CONFIG_FLAG, GattStatus::Ok),
            ConfigProgress::Unexpected
        );
        assert_eq!(stack.starts, 1);
    }

    #[test]
    fn failed_config_never_starts_advertising() {
        let mut stack = CountingStack::default();
        let mut adv = AdvertisingController::new(ADV_PARAMS);
        adv.configure(&mut stack, &ADV_DATA, None).unwrap();

        assert_eq!(
            adv.on_config_complete(&mut stack, ADV_CONFIG_FLAG, GattStatus::Error(1)),
            ConfigProgress::Complete
        );
        assert!(adv.is_failed());
        assert_eq!(stack.starts, 0);
    }

    #[test]
    fn rejected_scan_response_leaves_nothing_pending() {
        let mut stack = CountingStack {
            reject_scan_rsp: true,
            ..CountingStack::default()
        };
        let mut adv = AdvertisingController::new(ADV_PARAMS);

        assert_eq!(adv.configure(&mut stack, &ADV_DATA, Some(&ADV_DATA)), Err(()));
        assert_eq!(adv.pending(), 0);
        assert!(adv.is_failed());

        // The adv data command was already issued; its completion is stale
        assert_eq!(
            adv.on_config_complete(&mut stack, ADV_CONFIG_FLAG, GattStatus::Ok),
            ConfigProgress::Unexpected
        );
        assert_eq!(stack.starts, 0);
    }

    #[test]
    fn restart_does_not_wait_for_mask() {
        let mut stack = CountingStack::default();
        let mut adv = AdvertisingController::new(ADV_PARAMS);
        adv.on_connected();
        adv.restart(&mut stack);
        assert_eq!(stack.starts, 1);
        assert_eq!(stack.configs, 0);
    }
}
