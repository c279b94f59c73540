//! Stateless reject engine
//!
//! Answers intercepted packets the way a `REJECT` firewall target does: TCP
//! segments get a reset, UDP datagrams get an ICMP (or ICMPv6) port unreachable
//! message, and ICMP messages are dropped.
//!
//! The core ([`classify`], [`synthesize`]) is pure. [`Rejecter`] plugs it into a
//! `libreject_tools::DispatchEngine` and reports every intercepted packet.

pub mod checksum;
pub mod classify;
pub mod reject;
pub mod rejecter;
pub mod report;
pub mod templates;

#[cfg(test)]
mod test_util;

pub use checksum::{recompute_checksums, verify_checksums};
pub use classify::{classify, IpHeader, PacketView, Transport};
pub use reject::synthesize;
pub use rejecter::{RejectStats, Rejecter};
pub use report::{BlockReport, Reporter};
pub use templates::{RejectTemplates, ResponseTemplate};
