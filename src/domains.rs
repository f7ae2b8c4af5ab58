//! Static registry of configuration domains.
//!
//! Each [`Domain`] maps to a [`DomainSpec`] table describing which store it
//! uses, how its resources are addressed, the settings it owns, and the named
//! presets a user can apply. The mutation engine is generic over this table.
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::resources::HandleStrategy;
use crate::resources::handle::{NET_CLASS_KEY, TCPIP_INTERFACES_KEY};
use crate::setting::{Constraint, Desired, SettingKind, SettingSpec, SettingValue};

/// Machine-wide TCP/IP parameters key.
pub const TCPIP_PARAMETERS_KEY: &str = r"SYSTEM\CurrentControlSet\Services\Tcpip\Parameters";

/// Automatic Updates group policy key.
pub const WINDOWS_UPDATE_POLICY_KEY: &str =
    r"SOFTWARE\Policies\Microsoft\Windows\WindowsUpdate\AU";

/// Background update services whose start type `services` manages.
pub const UPDATE_SERVICES: &[NamedKey] = &[
    ("wuauserv", r"SYSTEM\CurrentControlSet\Services\wuauserv"),
    ("UsoSvc", r"SYSTEM\CurrentControlSet\Services\UsoSvc"),
    ("dosvc", r"SYSTEM\CurrentControlSet\Services\dosvc"),
    ("BITS", r"SYSTEM\CurrentControlSet\Services\BITS"),
];

/// A label and the store key it stands for.
pub type NamedKey = (&'static str, &'static str);

/// A configuration domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Per-adapter DNS servers.
    Dns,
    /// Per-adapter Large Send Offload.
    Lso,
    /// Per-interface IPv4 MTU.
    Mtu,
    /// Per-adapter power management.
    AdapterPower,
    /// Machine-wide TCP retransmission and keep-alive timing.
    TcpTimeout,
    /// Machine-wide TCP port range, `TIME_WAIT` delay and default TTL.
    TcpStack,
    /// Automatic Updates group policy.
    WindowsUpdate,
    /// Start type of the background update services.
    UpdateServices,
}

impl Domain {
    /// Every domain, in optimize order.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Dns,
            Self::Lso,
            Self::Mtu,
            Self::AdapterPower,
            Self::TcpTimeout,
            Self::TcpStack,
            Self::WindowsUpdate,
            Self::UpdateServices,
        ]
    }

    /// The domain's static table.
    #[must_use]
    pub const fn spec(self) -> &'static DomainSpec {
        match self {
            Self::Dns => &DNS,
            Self::Lso => &LSO,
            Self::Mtu => &MTU,
            Self::AdapterPower => &POWER,
            Self::TcpTimeout => &TCP,
            Self::TcpStack => &TCP_STACK,
            Self::WindowsUpdate => &WINDOWS_UPDATE,
            Self::UpdateServices => &SERVICES,
        }
    }

    /// Short name used on the command line and for snapshot files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        self.spec().name
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Domain {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dns" => Ok(Self::Dns),
            "lso" => Ok(Self::Lso),
            "mtu" => Ok(Self::Mtu),
            "power" | "adapter-power" => Ok(Self::AdapterPower),
            "tcp" | "tcp-timeout" => Ok(Self::TcpTimeout),
            "tcp-stack" => Ok(Self::TcpStack),
            "windows-update" | "wu" => Ok(Self::WindowsUpdate),
            "services" | "update-services" => Ok(Self::UpdateServices),
            other => Err(ValidationError::NotAllowed {
                setting: "domain".to_string(),
                value: other.to_string(),
                allowed: Self::all()
                    .iter()
                    .map(|d| d.name())
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

/// Which store backs a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    /// `HKEY_LOCAL_MACHINE`.
    Registry,
    /// `netsh interface ipv4`.
    Netsh,
}

/// Where a domain's settings live.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// One machine-wide key; no discovery.
    Machine {
        /// Store key.
        key: &'static str,
    },
    /// One key per discovered adapter.
    PerResource(HandleStrategy),
    /// A fixed list of named keys; no discovery.
    Keys(&'static [NamedKey]),
}

/// A value inside a [`Preset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresetValue {
    /// Integer value.
    Integer(i64),
    /// String value.
    Text(&'static str),
    /// Boolean value.
    Flag(bool),
    /// Delete the value.
    Unset,
}

impl PresetValue {
    fn desired(self) -> Desired {
        match self {
            Self::Integer(n) => Desired::Set(SettingValue::Integer(n)),
            Self::Text(s) => Desired::Set(SettingValue::String(s.to_string())),
            Self::Flag(b) => Desired::Set(SettingValue::Boolean(b)),
            Self::Unset => Desired::Unset,
        }
    }
}

/// A named set of desired values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    /// Name used with `--preset`.
    pub name: &'static str,
    /// One-line description for `list`.
    pub description: &'static str,
    /// Setting name and value pairs.
    pub values: &'static [(&'static str, PresetValue)],
}

/// Static description of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainSpec {
    /// The domain this table describes.
    pub domain: Domain,
    /// Short name.
    pub name: &'static str,
    /// Human-readable title for stage headers.
    pub title: &'static str,
    /// Backing store.
    pub store: StoreKind,
    /// Addressing.
    pub target: Target,
    /// Owned settings, in write order.
    pub settings: &'static [SettingSpec],
    /// Setting addressed by `--value`, if any.
    pub primary: Option<&'static str>,
    /// Named presets.
    pub presets: &'static [Preset],
    /// Preset applied when nothing else is requested.
    pub default_preset: &'static str,
}

/// Desired values in the domain's declared setting order.
pub type DesiredValues = Vec<(String, Desired)>;

impl DomainSpec {
    /// Look up a setting by name (case-insensitive).
    #[must_use]
    pub fn setting(&self, name: &str) -> Option<&'static SettingSpec> {
        self.settings
            .iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
    }

    /// Look up a preset by name (case-insensitive).
    #[must_use]
    pub fn preset(&self, name: &str) -> Option<&'static Preset> {
        self.presets
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Desired values of a preset.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::NotAllowed`] for an unknown preset name.
    pub fn preset_values(&self, name: &str) -> Result<DesiredValues, ValidationError> {
        let preset = self.preset(name).ok_or_else(|| ValidationError::NotAllowed {
            setting: format!("{} preset", self.name),
            value: name.to_string(),
            allowed: self
                .presets
                .iter()
                .map(|p| p.name)
                .collect::<Vec<_>>()
                .join(", "),
        })?;
        Ok(self.ordered(
            preset
                .values
                .iter()
                .map(|(n, v)| ((*n).to_string(), v.desired())),
        ))
    }

    /// Desired values from `name=value` assignments, parsed per setting kind.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownSetting`] for names outside the
    /// domain and [`ValidationError::TypeMismatch`] for unparsable values.
    pub fn assignment_values(
        &self,
        assignments: &[(String, String)],
    ) -> Result<DesiredValues, ValidationError> {
        let mut values = Vec::with_capacity(assignments.len());
        for (name, text) in assignments {
            let spec = self
                .setting(name)
                .ok_or_else(|| ValidationError::UnknownSetting {
                    setting: name.clone(),
                })?;
            values.push((spec.name.to_string(), Desired::Set(spec.parse(text)?)));
        }
        Ok(self.ordered(values))
    }

    /// Desired value for the primary setting.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::UnknownSetting`] if the domain has no
    /// primary setting.
    pub fn primary_value(&self, text: &str) -> Result<DesiredValues, ValidationError> {
        let name = self.primary.ok_or_else(|| ValidationError::UnknownSetting {
            setting: format!("{} has no single value; use --preset or --set", self.name),
        })?;
        self.assignment_values(&[(name.to_string(), text.to_string())])
    }

    /// Sort desired values into declared setting order; unknown names go last.
    fn ordered(&self, values: impl IntoIterator<Item = (String, Desired)>) -> DesiredValues {
        let mut values: DesiredValues = values.into_iter().collect();
        values.sort_by_key(|(name, _)| {
            self.settings
                .iter()
                .position(|s| s.name.eq_ignore_ascii_case(name))
                .unwrap_or(usize::MAX)
        });
        values
    }
}

const DNS: DomainSpec = DomainSpec {
    domain: Domain::Dns,
    name: "dns",
    title: "DNS servers",
    store: StoreKind::Registry,
    target: Target::PerResource(HandleStrategy::RegistryKey {
        bases: &[TCPIP_INTERFACES_KEY, NET_CLASS_KEY],
    }),
    settings: &[
        SettingSpec {
            name: "NameServer",
            kind: SettingKind::String,
            constraints: &[Constraint::Ipv4List],
            description: "static DNS servers, comma-separated (empty = automatic)",
        },
        SettingSpec {
            name: "EnableDHCP",
            kind: SettingKind::Boolean,
            constraints: &[],
            description: "obtain addresses from DHCP",
        },
    ],
    primary: Some("NameServer"),
    presets: &[
        Preset {
            name: "cloudflare",
            description: "1.1.1.1, 1.0.0.1",
            values: &[("NameServer", PresetValue::Text("1.1.1.1,1.0.0.1"))],
        },
        Preset {
            name: "google",
            description: "8.8.8.8, 8.8.4.4",
            values: &[("NameServer", PresetValue::Text("8.8.8.8,8.8.4.4"))],
        },
        Preset {
            name: "opendns",
            description: "208.67.222.222, 208.67.220.220",
            values: &[(
                "NameServer",
                PresetValue::Text("208.67.222.222,208.67.220.220"),
            )],
        },
        Preset {
            name: "quad9",
            description: "9.9.9.9, 149.112.112.112",
            values: &[("NameServer", PresetValue::Text("9.9.9.9,149.112.112.112"))],
        },
        Preset {
            name: "auto",
            description: "servers from DHCP",
            values: &[
                ("NameServer", PresetValue::Text("")),
                ("EnableDHCP", PresetValue::Flag(true)),
            ],
        },
    ],
    default_preset: "cloudflare",
};

const LSO: DomainSpec = DomainSpec {
    domain: Domain::Lso,
    name: "lso",
    title: "Large Send Offload",
    store: StoreKind::Registry,
    target: Target::PerResource(HandleStrategy::RegistryKey {
        bases: &[NET_CLASS_KEY],
    }),
    settings: &[
        SettingSpec {
            name: "*LsoV2IPv4",
            kind: SettingKind::String,
            constraints: &[Constraint::OneOf(&["0", "1"])],
            description: "Large Send Offload v2 (IPv4)",
        },
        SettingSpec {
            name: "*LsoV2IPv6",
            kind: SettingKind::String,
            constraints: &[Constraint::OneOf(&["0", "1"])],
            description: "Large Send Offload v2 (IPv6)",
        },
    ],
    primary: None,
    presets: &[
        Preset {
            name: "disable",
            description: "turn LSO off for IPv4 and IPv6",
            values: &[
                ("*LsoV2IPv4", PresetValue::Text("0")),
                ("*LsoV2IPv6", PresetValue::Text("0")),
            ],
        },
        Preset {
            name: "enable",
            description: "turn LSO on for IPv4 and IPv6",
            values: &[
                ("*LsoV2IPv4", PresetValue::Text("1")),
                ("*LsoV2IPv6", PresetValue::Text("1")),
            ],
        },
    ],
    default_preset: "disable",
};

/// Lowest accepted MTU.
pub const MIN_MTU: i64 = 576;
/// Highest accepted MTU.
pub const MAX_MTU: i64 = 9000;

const MTU: DomainSpec = DomainSpec {
    domain: Domain::Mtu,
    name: "mtu",
    title: "MTU",
    store: StoreKind::Netsh,
    target: Target::PerResource(HandleStrategy::InterfaceName),
    settings: &[SettingSpec {
        name: "MTU",
        kind: SettingKind::Integer,
        constraints: &[Constraint::Range {
            min: MIN_MTU,
            max: MAX_MTU,
        }],
        description: "IPv4 maximum transmission unit in bytes",
    }],
    primary: Some("MTU"),
    presets: &[
        Preset {
            name: "ethernet",
            description: "1500, Ethernet maximum",
            values: &[("MTU", PresetValue::Integer(1500))],
        },
        Preset {
            name: "pppoe",
            description: "1492, PPPoE links",
            values: &[("MTU", PresetValue::Integer(1492))],
        },
        Preset {
            name: "optimized",
            description: "1450, avoids fragmentation on most paths",
            values: &[("MTU", PresetValue::Integer(1450))],
        },
        Preset {
            name: "safe",
            description: "1400, works for most connections",
            values: &[("MTU", PresetValue::Integer(1400))],
        },
        Preset {
            name: "conservative",
            description: "1300, for problematic links",
            values: &[("MTU", PresetValue::Integer(1300))],
        },
        Preset {
            name: "ppp",
            description: "576, PPP minimum",
            values: &[("MTU", PresetValue::Integer(MIN_MTU))],
        },
    ],
    default_preset: "optimized",
};

const POWER: DomainSpec = DomainSpec {
    domain: Domain::AdapterPower,
    name: "power",
    title: "Adapter power management",
    store: StoreKind::Registry,
    target: Target::PerResource(HandleStrategy::RegistryKey {
        bases: &[NET_CLASS_KEY],
    }),
    settings: &[SettingSpec {
        name: "PnPCapabilities",
        kind: SettingKind::Integer,
        constraints: &[Constraint::Range {
            min: 0,
            max: 0xFFFF,
        }],
        description: "device power capability flags",
    }],
    primary: Some("PnPCapabilities"),
    presets: &[
        Preset {
            name: "disable-saving",
            description: "stop Windows turning the adapter off to save power",
            values: &[("PnPCapabilities", PresetValue::Integer(0))],
        },
        Preset {
            name: "default",
            description: "remove the override",
            values: &[("PnPCapabilities", PresetValue::Unset)],
        },
    ],
    default_preset: "disable-saving",
};

const TCP: DomainSpec = DomainSpec {
    domain: Domain::TcpTimeout,
    name: "tcp",
    title: "TCP timeouts",
    store: StoreKind::Registry,
    target: Target::Machine {
        key: TCPIP_PARAMETERS_KEY,
    },
    settings: &[
        SettingSpec {
            name: "TcpMaxDataRetransmissions",
            kind: SettingKind::Integer,
            constraints: &[Constraint::Range { min: 1, max: 255 }],
            description: "retransmissions before a connection is dropped",
        },
        SettingSpec {
            name: "KeepAliveTime",
            kind: SettingKind::Integer,
            constraints: &[Constraint::Range {
                min: 60_000,
                max: 4_294_967_295,
            }],
            description: "idle milliseconds before a keep-alive packet",
        },
    ],
    primary: None,
    presets: &[
        Preset {
            name: "optimized",
            description: "10 retransmissions, 2 h keep-alive",
            values: &[
                ("TcpMaxDataRetransmissions", PresetValue::Integer(10)),
                ("KeepAliveTime", PresetValue::Integer(7_200_000)),
            ],
        },
        Preset {
            name: "default",
            description: "remove both overrides",
            values: &[
                ("TcpMaxDataRetransmissions", PresetValue::Unset),
                ("KeepAliveTime", PresetValue::Unset),
            ],
        },
    ],
    default_preset: "optimized",
};

const TCP_STACK: DomainSpec = DomainSpec {
    domain: Domain::TcpStack,
    name: "tcp-stack",
    title: "TCP stack",
    store: StoreKind::Registry,
    target: Target::Machine {
        key: TCPIP_PARAMETERS_KEY,
    },
    settings: &[
        SettingSpec {
            name: "TcpTimedWaitDelay",
            kind: SettingKind::Integer,
            constraints: &[Constraint::Range { min: 30, max: 240 }],
            description: "seconds a closed connection stays in TIME_WAIT",
        },
        SettingSpec {
            name: "MaxUserPort",
            kind: SettingKind::Integer,
            constraints: &[Constraint::Range {
                min: 5000,
                max: 65534,
            }],
            description: "highest ephemeral port",
        },
        SettingSpec {
            name: "DefaultTTL",
            kind: SettingKind::Integer,
            constraints: &[Constraint::Range { min: 1, max: 255 }],
            description: "IP time-to-live for outgoing packets",
        },
    ],
    primary: None,
    presets: &[
        Preset {
            name: "optimized",
            description: "30 s TIME_WAIT, ports up to 65534, TTL 64",
            values: &[
                ("TcpTimedWaitDelay", PresetValue::Integer(30)),
                ("MaxUserPort", PresetValue::Integer(65534)),
                ("DefaultTTL", PresetValue::Integer(64)),
            ],
        },
        Preset {
            name: "default",
            description: "remove all three overrides",
            values: &[
                ("TcpTimedWaitDelay", PresetValue::Unset),
                ("MaxUserPort", PresetValue::Unset),
                ("DefaultTTL", PresetValue::Unset),
            ],
        },
    ],
    default_preset: "optimized",
};

const WINDOWS_UPDATE: DomainSpec = DomainSpec {
    domain: Domain::WindowsUpdate,
    name: "windows-update",
    title: "Windows Update policy",
    store: StoreKind::Registry,
    target: Target::Machine {
        key: WINDOWS_UPDATE_POLICY_KEY,
    },
    settings: &[
        SettingSpec {
            name: "NoAutoUpdate",
            kind: SettingKind::Integer,
            constraints: &[Constraint::Range { min: 0, max: 1 }],
            description: "1 turns automatic updates off",
        },
        SettingSpec {
            name: "AUOptions",
            kind: SettingKind::Integer,
            constraints: &[Constraint::Range { min: 1, max: 5 }],
            description: "1 never checks, 2 notifies, 3 downloads, 4 installs on schedule",
        },
        SettingSpec {
            name: "ScheduledInstallDay",
            kind: SettingKind::Integer,
            constraints: &[Constraint::Range { min: 0, max: 7 }],
            description: "0 every day, 1-7 Sunday to Saturday",
        },
        SettingSpec {
            name: "ScheduledInstallTime",
            kind: SettingKind::Integer,
            constraints: &[Constraint::Range { min: 0, max: 23 }],
            description: "hour of the scheduled install",
        },
    ],
    primary: None,
    presets: &[
        Preset {
            name: "disable",
            description: "no automatic updates; schedule set to 03:00 daily",
            values: &[
                ("NoAutoUpdate", PresetValue::Integer(1)),
                ("AUOptions", PresetValue::Integer(1)),
                ("ScheduledInstallDay", PresetValue::Integer(0)),
                ("ScheduledInstallTime", PresetValue::Integer(3)),
            ],
        },
        Preset {
            name: "default",
            description: "remove the policy values",
            values: &[
                ("NoAutoUpdate", PresetValue::Unset),
                ("AUOptions", PresetValue::Unset),
                ("ScheduledInstallDay", PresetValue::Unset),
                ("ScheduledInstallTime", PresetValue::Unset),
            ],
        },
    ],
    default_preset: "disable",
};

const SERVICES: DomainSpec = DomainSpec {
    domain: Domain::UpdateServices,
    name: "services",
    title: "Update service start types",
    store: StoreKind::Registry,
    target: Target::Keys(UPDATE_SERVICES),
    settings: &[SettingSpec {
        name: "Start",
        kind: SettingKind::Integer,
        constraints: &[Constraint::Range { min: 0, max: 4 }],
        description: "2 automatic, 3 manual, 4 disabled",
    }],
    primary: Some("Start"),
    presets: &[
        Preset {
            name: "disable",
            description: "services never start",
            values: &[("Start", PresetValue::Integer(4))],
        },
        Preset {
            name: "manual",
            description: "start on demand",
            values: &[("Start", PresetValue::Integer(3))],
        },
        Preset {
            name: "automatic",
            description: "start at boot",
            values: &[("Start", PresetValue::Integer(2))],
        },
    ],
    default_preset: "disable",
};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn every_domain_round_trips_through_from_str() {
        for d in Domain::all() {
            assert_eq!(d.name().parse::<Domain>().unwrap(), *d);
            assert_eq!(d.spec().domain, *d);
        }
    }

    #[test]
    fn aliases_parse() {
        assert_eq!("adapter-power".parse::<Domain>().unwrap(), Domain::AdapterPower);
        assert_eq!("TCP-Timeout".parse::<Domain>().unwrap(), Domain::TcpTimeout);
        assert!("firewall".parse::<Domain>().is_err());
    }

    #[test]
    fn default_presets_exist_and_validate() {
        for d in Domain::all() {
            let spec = d.spec();
            let values = spec.preset_values(spec.default_preset).unwrap();
            for (name, desired) in values {
                let setting = spec.setting(&name).unwrap();
                if let Desired::Set(v) = desired {
                    setting.validate(&v).unwrap();
                }
            }
        }
    }

    #[test]
    fn every_preset_names_known_settings() {
        for d in Domain::all() {
            let spec = d.spec();
            for preset in spec.presets {
                for (name, _) in preset.values {
                    assert!(spec.setting(name).is_some(), "{}: {name}", spec.name);
                }
            }
        }
    }

    #[test]
    fn dns_auto_sets_dhcp() {
        let values = Domain::Dns.spec().preset_values("auto").unwrap();
        assert_eq!(values.len(), 2);
        assert_eq!(values[0].0, "NameServer");
        assert_eq!(
            values[1],
            (
                "EnableDHCP".to_string(),
                Desired::Set(SettingValue::Boolean(true))
            )
        );
    }

    #[test]
    fn unknown_preset_lists_choices() {
        let err = Domain::Dns.spec().preset_values("bogus").unwrap_err();
        assert!(err.to_string().contains("cloudflare"));
    }

    #[test]
    fn assignments_are_reordered_to_declared_order() {
        let values = Domain::TcpTimeout
            .spec()
            .assignment_values(&[
                ("keepalivetime".into(), "60000".into()),
                ("TcpMaxDataRetransmissions".into(), "5".into()),
            ])
            .unwrap();
        assert_eq!(values[0].0, "TcpMaxDataRetransmissions");
        assert_eq!(values[1].0, "KeepAliveTime");
    }

    #[test]
    fn primary_value_requires_primary_setting() {
        assert!(Domain::Lso.spec().primary_value("0").is_err());
        let v = Domain::Mtu.spec().primary_value("1500").unwrap();
        assert_eq!(v[0].1, Desired::Set(SettingValue::Integer(1500)));
    }

    #[test]
    fn new_aliases_parse() {
        assert_eq!("WU".parse::<Domain>().unwrap(), Domain::WindowsUpdate);
        assert_eq!("services".parse::<Domain>().unwrap(), Domain::UpdateServices);
        assert_eq!("tcp-stack".parse::<Domain>().unwrap(), Domain::TcpStack);
    }

    #[test]
    fn windows_update_disable_values() {
        let values = Domain::WindowsUpdate.spec().preset_values("disable").unwrap();
        let pairs: Vec<(&str, &Desired)> = values.iter().map(|(n, d)| (n.as_str(), d)).collect();
        assert_eq!(
            pairs,
            [
                ("NoAutoUpdate", &Desired::Set(SettingValue::Integer(1))),
                ("AUOptions", &Desired::Set(SettingValue::Integer(1))),
                ("ScheduledInstallDay", &Desired::Set(SettingValue::Integer(0))),
                ("ScheduledInstallTime", &Desired::Set(SettingValue::Integer(3))),
            ]
        );
    }

    #[test]
    fn tcp_stack_optimized_values() {
        let values = Domain::TcpStack.spec().preset_values("optimized").unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[1].1, Desired::Set(SettingValue::Integer(65534)));
        let port = Domain::TcpStack.spec().setting("maxuserport").unwrap();
        assert!(port.validate(&SettingValue::Integer(65535)).is_err());
    }

    #[test]
    fn services_cover_the_update_services() {
        let Target::Keys(keys) = Domain::UpdateServices.spec().target else {
            panic!("services must use fixed keys");
        };
        let names: Vec<&str> = keys.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, ["wuauserv", "UsoSvc", "dosvc", "BITS"]);
        assert!(keys.iter().all(|(name, key)| key.ends_with(*name)));
    }

    #[test]
    fn power_default_is_unset() {
        let v = Domain::AdapterPower.spec().preset_values("default").unwrap();
        assert_eq!(v[0].1, Desired::Unset);
    }
}
