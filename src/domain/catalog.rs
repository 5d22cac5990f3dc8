//! Built-in SGS series catalog.
//!
//! Value kind is a static property of each series. All built-in indices
//! publish the monthly percentage variation; the monthly series codes below
//! are the ones the central bank documents as "variação % mensal".

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::types::{SeriesDescriptor, ValueKind};

/// Built-in price indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum IndexKey {
    Igpm,
    Igpdi,
    Ipca,
    Ipcfipe,
}

impl IndexKey {
    pub const ALL: [IndexKey; 4] = [IndexKey::Igpm, IndexKey::Igpdi, IndexKey::Ipca, IndexKey::Ipcfipe];

    pub fn key(self) -> &'static str {
        match self {
            IndexKey::Igpm => "igpm",
            IndexKey::Igpdi => "igpdi",
            IndexKey::Ipca => "ipca",
            IndexKey::Ipcfipe => "ipcfipe",
        }
    }

    pub fn sgs_code(self) -> u32 {
        match self {
            IndexKey::Igpm => 189,
            IndexKey::Igpdi => 190,
            IndexKey::Ipca => 433,
            IndexKey::Ipcfipe => 193,
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            IndexKey::Igpm => "IGP-M (FGV)",
            IndexKey::Igpdi => "IGP-DI (FGV)",
            IndexKey::Ipca => "IPCA (IBGE)",
            IndexKey::Ipcfipe => "IPC-FIPE",
        }
    }

    pub fn kind(self) -> ValueKind {
        ValueKind::Percentage
    }

    pub fn descriptor(self) -> SeriesDescriptor {
        SeriesDescriptor::new(
            self.key(),
            self.sgs_code(),
            &format!("{} (SGS {})", self.display_name(), self.sgs_code()),
            self.kind(),
        )
    }

    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ALL.iter().position(|k| *k == self).unwrap_or(0);
        Self::ALL[(idx + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// All built-in descriptors, in display order.
pub fn catalog() -> Vec<SeriesDescriptor> {
    IndexKey::ALL.iter().map(|k| k.descriptor()).collect()
}

/// Look up a built-in descriptor by key (case-insensitive) or by SGS code.
pub fn find_series(needle: &str) -> Option<SeriesDescriptor> {
    let needle = needle.trim();
    IndexKey::ALL
        .iter()
        .find(|k| k.key().eq_ignore_ascii_case(needle) || k.sgs_code().to_string() == needle)
        .map(|k| k.descriptor())
}
