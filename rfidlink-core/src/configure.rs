//! Reader configuration applied after connect

use std::fmt;

/// Which subsystem owns the handheld trigger
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TriggerMode {
    Rfid,
    Barcode,
}

/// Start/stop trigger type
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TriggerType {
    /// Start or stop as soon as the action is issued
    Immediate,

    /// Follow the handheld trigger
    Handheld,
}

/// Gen2 inventory session
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Gen2Session {
    S0,
    S1,
    S2,
    S3,
}

/// Gen2 inventoried flag target
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InventoryState {
    A,
    B,
    AbFlip,
}

/// Gen2 SL flag selection
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SlFlag {
    All,
    Asserted,
    Deasserted,
}

/// One step of the post-connect configuration
///
/// The driver maps each step onto its vendor calls. A failing step is
/// skipped; the reader stays connected with its defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigStep {
    /// Which notifications the reader raises
    EnableEvents {
        handheld: bool,
        tag_read: bool,
        attach_tag_data: bool,
    },

    TriggerMode(TriggerMode),

    StartTrigger(TriggerType),

    StopTrigger(TriggerType),

    /// Transmit power and RF mode for one antenna
    AntennaRf {
        antenna: u16,
        power_index: u16,
        rf_mode_table_index: u32,
        tari: u32,
    },

    /// Singulation control for one antenna
    Singulation {
        antenna: u16,
        session: Gen2Session,
        state: InventoryState,
        sl_flag: SlFlag,
    },
}

impl ConfigStep {
    /// The sequence applied to every freshly connected reader
    ///
    /// Immediate triggers, RFID trigger mode, full power on `antenna`,
    /// session S0 with inventory state A.
    pub fn standard_sequence(antenna: u16, max_power_index: u16) -> Vec<ConfigStep> {
        vec![
            Self::EnableEvents {
                handheld: true,
                tag_read: true,
                attach_tag_data: false,
            },
            Self::TriggerMode(TriggerMode::Rfid),
            Self::StartTrigger(TriggerType::Immediate),
            Self::StopTrigger(TriggerType::Immediate),
            Self::AntennaRf {
                antenna,
                power_index: max_power_index,
                rf_mode_table_index: 0,
                tari: 0,
            },
            Self::Singulation {
                antenna,
                session: Gen2Session::S0,
                state: InventoryState::A,
                sl_flag: SlFlag::All,
            },
        ]
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            Self::EnableEvents { .. } => "enable-events",
            Self::TriggerMode(_) => "trigger-mode",
            Self::StartTrigger(_) => "start-trigger",
            Self::StopTrigger(_) => "stop-trigger",
            Self::AntennaRf { .. } => "antenna-rf",
            Self::Singulation { .. } => "singulation",
        }
    }
}

impl fmt::Display for ConfigStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AntennaRf { antenna, power_index, .. } => {
                write!(f, "{}(antenna={}, power={})", self.name(), antenna, power_index)
            }
            Self::Singulation { antenna, session, state, .. } => {
                write!(f, "{}(antenna={}, {:?}, {:?})", self.name(), antenna, session, state)
            }
            _ => f.write_str(self.name()),
        }
    }
}
