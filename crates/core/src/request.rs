//! Request record and the request-type -> device-command translation
//! tables (`spec.md` §6).
//!
//! A [`Request`] is device-model-agnostic: it names a logical request
//! type (`Read`, `Write`, a PIM operation, ...) and [`RequestType::final_command`]
//! resolves that to the concrete mnemonic a given [`DeviceSpec`] actually
//! uses (GDDR6's `RD` vs LPDDR5's `RD16`, both meaning "single-bank
//! read").

use std::fmt;

use crate::spec::{Clock, CommandId, DeviceSpec};

/// PIM operation kind, tagged with the bank fanout `spec.md` §6's table
/// assigns it: 1 (single bank), 4 (intra-bankgroup, disabled per Open
/// Question (i)), 16 (all-bank), or 0 (no-bank, datapath-register only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PimKind {
    MacSbk,
    AfSbk,
    CopyBkgb,
    CopyGbbk,
    Mac4bkIntraBg,
    Af4bkIntraBg,
    Ewmul,
    Ewadd,
    MacAbk,
    AfAbk,
    WrAflut,
    WrBk,
    WrGb,
    WrMac,
    WrBias,
    RdMac,
    RdAf,
}

impl PimKind {
    /// Number of banks this operation fans out over.
    #[must_use]
    pub fn fanout(self) -> u32 {
        match self {
            Self::MacSbk | Self::AfSbk | Self::CopyBkgb | Self::CopyGbbk => 1,
            Self::Mac4bkIntraBg | Self::Af4bkIntraBg | Self::Ewmul | Self::Ewadd => 4,
            Self::MacAbk | Self::AfAbk | Self::WrAflut | Self::WrBk => 16,
            Self::WrGb | Self::WrMac | Self::WrBias | Self::RdMac | Self::RdAf => 0,
        }
    }

    /// Device mnemonics that implement this operation, most device-model-
    /// specific name first.
    fn candidate_names(self) -> &'static [&'static str] {
        match self {
            Self::MacSbk => &["MACSB"],
            Self::AfSbk => &["AFSB"],
            Self::CopyBkgb => &["RDCP"],
            Self::CopyGbbk => &["WRCP"],
            Self::Mac4bkIntraBg => &["MAC4B_INTRA"],
            Self::Af4bkIntraBg => &["AF4B_INTRA"],
            Self::Ewmul => &["EWMUL"],
            Self::Ewadd => &["EWADD"],
            Self::MacAbk => &["MACAB"],
            Self::AfAbk => &["AFAB"],
            Self::WrAflut => &["WRAFLUT"],
            Self::WrBk => &["WRBK"],
            Self::WrGb => &["WRGB"],
            Self::WrMac => &["WRMAC"],
            Self::WrBias => &["WRBIAS"],
            Self::RdMac => &["RDMAC"],
            Self::RdAf => &["RDAF"],
        }
    }
}

/// Logical request type, independent of device model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    Read,
    Write,
    /// All-bank refresh (`REFab`).
    AllBankRefresh,
    /// Single-bank precharge requested directly by a trace (`PREsb`).
    PrechargeSingleBank,
    Pim(PimKind),
}

impl RequestType {
    fn candidate_names(self) -> &'static [&'static str] {
        match self {
            Self::Read => &["RD16", "RD"],
            Self::Write => &["WR16", "WR"],
            Self::AllBankRefresh => &["REFab"],
            Self::PrechargeSingleBank => &["PRE"],
            Self::Pim(kind) => kind.candidate_names(),
        }
    }

    /// Number of banks this request type touches.
    #[must_use]
    pub fn fanout(self) -> u32 {
        match self {
            Self::Read | Self::Write | Self::PrechargeSingleBank => 1,
            Self::AllBankRefresh => 0,
            Self::Pim(kind) => kind.fanout(),
        }
    }

    #[must_use]
    pub fn is_pim(self) -> bool {
        matches!(self, Self::Pim(_))
    }

    #[must_use]
    pub fn is_write(self) -> bool {
        matches!(
            self,
            Self::Write | Self::Pim(PimKind::CopyGbbk | PimKind::WrAflut | PimKind::WrBk | PimKind::WrGb | PimKind::WrMac | PimKind::WrBias)
        )
    }

    /// Resolve the concrete command this request type issues on `spec`.
    ///
    /// # Panics
    /// If none of this type's candidate mnemonics exist on `spec` --
    /// every shipped device model declares every request type's command,
    /// so this is an internal-consistency invariant, not user input.
    #[must_use]
    pub fn final_command(self, spec: &DeviceSpec) -> CommandId {
        self.candidate_names()
            .iter()
            .find_map(|name| spec.command_id_opt(name))
            .unwrap_or_else(|| panic!("device spec has no command implementing request type {self:?}"))
    }
}

/// One in-flight request.
pub struct Request {
    /// Full address hierarchy, channel first, column last; `-1` entries
    /// are wildcards (broadcast levels for all-bank/4-bank operations).
    pub addr_h: Vec<i32>,
    pub request_type: RequestType,
    /// Opaque caller-assigned id (e.g. a trace line number), carried
    /// through to the completion callback for correlation.
    pub source_id: u64,
    /// The command currently being chased toward `final_command`
    /// (`spec.md` §4.5/§4.9: an intermediate `ACT`/`PRE`/resync command,
    /// or `final_command` itself once those prerequisites are cleared).
    pub command: CommandId,
    pub final_command: CommandId,
    pub arrive: Clock,
    pub issue: Option<Clock>,
    pub depart: Option<Clock>,
    on_complete: Option<Box<dyn FnOnce(&Request) + Send>>,
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("addr_h", &self.addr_h)
            .field("request_type", &self.request_type)
            .field("source_id", &self.source_id)
            .field("command", &self.command)
            .field("final_command", &self.final_command)
            .field("arrive", &self.arrive)
            .field("issue", &self.issue)
            .field("depart", &self.depart)
            .finish_non_exhaustive()
    }
}

impl Request {
    #[must_use]
    pub fn new(addr_h: Vec<i32>, request_type: RequestType, source_id: u64, final_command: CommandId, arrive: Clock) -> Self {
        Self {
            addr_h,
            request_type,
            source_id,
            command: final_command,
            final_command,
            arrive,
            issue: None,
            depart: None,
            on_complete: None,
        }
    }

    /// Attach a completion callback, invoked once from [`Self::retire`].
    #[must_use]
    pub fn with_completion(mut self, on_complete: impl FnOnce(&Request) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(on_complete));
        self
    }

    /// Whether this request is chasing a prerequisite rather than its
    /// own final command.
    #[must_use]
    pub fn is_ready_to_finish(&self) -> bool {
        self.command == self.final_command
    }

    /// Mark the request departed at `clk` and fire its completion
    /// callback, if any.
    pub fn retire(mut self, clk: Clock) {
        self.depart = Some(clk);
        if let Some(cb) = self.on_complete.take() {
            cb(&self);
        }
    }
}
