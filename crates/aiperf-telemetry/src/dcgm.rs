//! The default set of DCGM fields AIPerf scrapes from a `dcgm-exporter`
//! Prometheus endpoint, and the unit families their values are reported in.
//!
//! Grounded in `original_source/src/aiperf/gpu_telemetry/metrics_config.py`'s
//! `constants.GPU_TELEMETRY_METRICS_CONFIG` / `DCGM_TO_FIELD_MAPPING` tables.

/// The unit family a telemetry value is reported in. Distinct from
/// `aiperf_core::enums::MetricUnit`, which only covers request-latency-style
/// metrics - GPU telemetry has its own set (power, temperature, frequency,
/// size) that a request metric never needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TelemetryUnit {
    Watt,
    Celsius,
    Megahertz,
    Gigahertz,
    Percent,
    Gigabytes,
    Megabytes,
    Kilobytes,
    Microseconds,
    Milliseconds,
    Seconds,
    Megajoule,
    Joule,
    Count,
}

impl TelemetryUnit {
    pub fn label(self) -> &'static str {
        match self {
            TelemetryUnit::Watt => "W",
            TelemetryUnit::Celsius => "C",
            TelemetryUnit::Megahertz => "MHz",
            TelemetryUnit::Gigahertz => "GHz",
            TelemetryUnit::Percent => "%",
            TelemetryUnit::Gigabytes => "GB",
            TelemetryUnit::Megabytes => "MB",
            TelemetryUnit::Kilobytes => "KB",
            TelemetryUnit::Microseconds => "us",
            TelemetryUnit::Milliseconds => "ms",
            TelemetryUnit::Seconds => "s",
            TelemetryUnit::Megajoule => "MJ",
            TelemetryUnit::Joule => "J",
            TelemetryUnit::Count => "",
        }
    }
}

/// One recognized DCGM field: its exposition-format metric name, the
/// internal field name AIPerf reports it under, a display name, and the
/// unit its value is in.
#[derive(Debug, Clone, Copy)]
pub struct DcgmFieldSpec {
    pub dcgm_field: &'static str,
    pub internal_name: &'static str,
    pub display_name: &'static str,
    pub unit: TelemetryUnit,
}

/// The default DCGM fields every GPU exporter exposes, mirroring the
/// reference implementation's built-in `GPU_TELEMETRY_METRICS_CONFIG`.
pub const DEFAULT_FIELDS: &[DcgmFieldSpec] = &[
    DcgmFieldSpec {
        dcgm_field: "DCGM_FI_DEV_POWER_USAGE",
        internal_name: "power_usage",
        display_name: "GPU Power Usage",
        unit: TelemetryUnit::Watt,
    },
    DcgmFieldSpec {
        dcgm_field: "DCGM_FI_DEV_GPU_TEMP",
        internal_name: "gpu_temperature",
        display_name: "GPU Temperature",
        unit: TelemetryUnit::Celsius,
    },
    DcgmFieldSpec {
        dcgm_field: "DCGM_FI_DEV_GPU_UTIL",
        internal_name: "gpu_utilization",
        display_name: "GPU Utilization",
        unit: TelemetryUnit::Percent,
    },
    DcgmFieldSpec {
        dcgm_field: "DCGM_FI_DEV_MEM_COPY_UTIL",
        internal_name: "memory_copy_utilization",
        display_name: "Memory Copy Utilization",
        unit: TelemetryUnit::Percent,
    },
    DcgmFieldSpec {
        dcgm_field: "DCGM_FI_DEV_FB_USED",
        internal_name: "memory_used",
        display_name: "GPU Memory Used",
        unit: TelemetryUnit::Megabytes,
    },
    DcgmFieldSpec {
        dcgm_field: "DCGM_FI_DEV_FB_FREE",
        internal_name: "memory_free",
        display_name: "GPU Memory Free",
        unit: TelemetryUnit::Megabytes,
    },
    DcgmFieldSpec {
        dcgm_field: "DCGM_FI_DEV_SM_CLOCK",
        internal_name: "sm_clock",
        display_name: "SM Clock Frequency",
        unit: TelemetryUnit::Megahertz,
    },
    DcgmFieldSpec {
        dcgm_field: "DCGM_FI_DEV_TOTAL_ENERGY_CONSUMPTION",
        internal_name: "total_energy_consumption",
        display_name: "Total Energy Consumption",
        unit: TelemetryUnit::Megajoule,
    },
    DcgmFieldSpec {
        dcgm_field: "DCGM_FI_DEV_XID_ERRORS",
        internal_name: "xid_errors",
        display_name: "XID Errors",
        unit: TelemetryUnit::Count,
    },
];

pub fn lookup(dcgm_field: &str) -> Option<DcgmFieldSpec> {
    DEFAULT_FIELDS.iter().copied().find(|spec| spec.dcgm_field == dcgm_field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn looks_up_a_known_field() {
        let spec = lookup("DCGM_FI_DEV_POWER_USAGE").unwrap();
        assert_eq!(spec.internal_name, "power_usage");
        assert_eq!(spec.unit.label(), "W");
    }

    #[test]
    fn unknown_field_returns_none() {
        assert!(lookup("DCGM_FI_DEV_DOES_NOT_EXIST").is_none());
    }
}
