//! RAID Dialects
//!
//! The controller addressing schemes smartctl understands via `-d`, and the
//! per-dialect probing policy used by the RAID pass.

use serde::Serialize;

use crate::domain::ports::DeviceHandle;

/// RAID controller dialect passed to smartctl's `-d` option
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RaidDialect {
    /// 3ware controllers
    ThreeWare,
    /// Areca controllers (member disks are numbered from 1)
    Areca,
    /// HP Smart Array (cciss) controllers
    Cciss,
    /// LSI MegaRAID and Dell PERC controllers
    MegaRaid,
    /// SCSI-to-ATA translation pass-through
    Sat,
}

/// How a RAID worker addresses a dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectPolicy {
    /// Index a fresh worker starts from
    pub start_index: u32,
    /// Whether the dialect takes a `,<index>` suffix
    pub indexable: bool,
    /// Whether a recorded member retires the worker
    pub single_shot: bool,
}

impl RaidDialect {
    /// All dialects, in probing order
    pub const ALL: [RaidDialect; 5] = [
        RaidDialect::ThreeWare,
        RaidDialect::Areca,
        RaidDialect::Cciss,
        RaidDialect::MegaRaid,
        RaidDialect::Sat,
    ];

    /// Name as understood by smartctl
    pub fn as_str(&self) -> &'static str {
        match self {
            RaidDialect::ThreeWare => "3ware",
            RaidDialect::Areca => "areca",
            RaidDialect::Cciss => "cciss",
            RaidDialect::MegaRaid => "megaraid",
            RaidDialect::Sat => "sat",
        }
    }

    pub fn policy(&self) -> DialectPolicy {
        match self {
            RaidDialect::Areca => DialectPolicy {
                start_index: 1,
                indexable: true,
                single_shot: false,
            },
            RaidDialect::Sat => DialectPolicy {
                start_index: 0,
                indexable: false,
                single_shot: true,
            },
            RaidDialect::ThreeWare | RaidDialect::Cciss | RaidDialect::MegaRaid => DialectPolicy {
                start_index: 0,
                indexable: true,
                single_shot: false,
            },
        }
    }

    /// smartctl device argument for member `index` behind `base`
    /// (`/dev/sda -d megaraid,0`, or `/dev/sda -d sat`).
    pub fn target(&self, base: &str, index: u32) -> String {
        if self.policy().indexable {
            format!("{} -d {},{}", base, self.as_str(), index)
        } else {
            format!("{} -d {}", base, self.as_str())
        }
    }

    /// Display name recorded for a member found while the worker index was
    /// `index` (`/dev/sda megaraid,0`, `/dev/sda sat,4`).
    pub fn member_name(&self, base: &str, index: u32) -> String {
        format!("{} {},{}", base, self.as_str(), index)
    }
}

impl std::fmt::Display for RaidDialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One unit of RAID-probing work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RaidProbeTask {
    pub base: DeviceHandle,
    pub dialect: RaidDialect,
}

impl RaidProbeTask {
    /// Cross product of `candidates` with every dialect.
    pub fn expand(candidates: &[DeviceHandle]) -> Vec<RaidProbeTask> {
        candidates
            .iter()
            .flat_map(|base| {
                RaidDialect::ALL.iter().map(move |dialect| RaidProbeTask {
                    base: base.clone(),
                    dialect: *dialect,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_names() {
        let names: Vec<_> = RaidDialect::ALL.iter().map(|d| d.as_str()).collect();
        assert_eq!(names, vec!["3ware", "areca", "cciss", "megaraid", "sat"]);
        assert_eq!(format!("{}", RaidDialect::MegaRaid), "megaraid");
    }

    #[test]
    fn test_policy_table() {
        assert_eq!(RaidDialect::Areca.policy().start_index, 1);
        for dialect in [RaidDialect::ThreeWare, RaidDialect::Cciss, RaidDialect::MegaRaid] {
            let policy = dialect.policy();
            assert_eq!(policy.start_index, 0);
            assert!(policy.indexable);
            assert!(!policy.single_shot);
        }

        let sat = RaidDialect::Sat.policy();
        assert!(!sat.indexable);
        assert!(sat.single_shot);
    }

    #[test]
    fn test_target_strings() {
        assert_eq!(
            RaidDialect::MegaRaid.target("/dev/sda", 3),
            "/dev/sda -d megaraid,3"
        );
        assert_eq!(RaidDialect::Areca.target("/dev/sg2", 1), "/dev/sg2 -d areca,1");
        assert_eq!(RaidDialect::Sat.target("/dev/sda", 7), "/dev/sda -d sat");
    }

    #[test]
    fn test_member_names() {
        assert_eq!(
            RaidDialect::Cciss.member_name("/dev/sda", 0),
            "/dev/sda cciss,0"
        );
        assert_eq!(RaidDialect::Sat.member_name("/dev/sda", 4), "/dev/sda sat,4");
        assert_eq!(RaidDialect::Sat.target("/dev/sda", 4), "/dev/sda -d sat");
    }

    #[test]
    fn test_expand_is_full_cross_product() {
        let candidates = vec![DeviceHandle::new("/dev/sda"), DeviceHandle::new("/dev/sdb")];
        let tasks = RaidProbeTask::expand(&candidates);

        assert_eq!(tasks.len(), 10);
        assert_eq!(
            tasks
                .iter()
                .filter(|t| t.dialect == RaidDialect::Sat)
                .count(),
            2
        );
        assert!(RaidProbeTask::expand(&[]).is_empty());
    }
}
