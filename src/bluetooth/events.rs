#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnId(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttHandle(pub u16);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BdAddr(pub [u8; 6]);

impl core::fmt::Display for BdAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattStatus {
    Ok,
    /// Any other non-success code reported by the stack.
    Error(u8),
}

impl GattStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, GattStatus::Ok)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GapEvent {
    AdvDataSetComplete { status: GattStatus },
    ScanRspDataSetComplete { status: GattStatus },
    AdvStartComplete { status: GattStatus },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GattsEvent<'a> {
    Registered {
        status: GattStatus,
        app_id: u16,
    },
    ServiceCreated {
        status: GattStatus,
        service_handle: AttHandle,
    },
    ServiceStarted {
        status: GattStatus,
        service_handle: AttHandle,
    },
    CharacteristicAdded {
        status: GattStatus,
        attr_handle: AttHandle,
    },
    DescriptorAdded {
        status: GattStatus,
        attr_handle: AttHandle,
    },
    Connect {
        conn_id: ConnId,
        remote: BdAddr,
    },
    Disconnect {
        conn_id: ConnId,
        remote: BdAddr,
        reason: u8,
    },
    Read {
        conn_id: ConnId,
        trans_id: TransId,
        handle: AttHandle,
    },
    Write {
        conn_id: ConnId,
        trans_id: TransId,
        handle: AttHandle,
        value: &'a [u8],
        need_rsp: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackEvent<'a> {
    Gap(GapEvent),
    Gatts(GattsEvent<'a>),
}
