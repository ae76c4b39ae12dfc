//! The static metric tag table: one entry per tag a processor can emit,
//! carrying its display header, unit, and export flags.

use aiperf_core::enums::{MetricFlag, MetricUnit};

/// Static metadata for one metric tag, independent of any single record.
#[derive(Debug, Clone, Copy)]
pub struct MetricSpec {
    pub tag: &'static str,
    pub header: &'static str,
    pub unit: MetricUnit,
    pub flags: &'static [MetricFlag],
}

impl MetricSpec {
    pub fn has_flag(&self, flag: MetricFlag) -> bool {
        self.flags.contains(&flag)
    }
}

pub const REQUEST_LATENCY: MetricSpec = MetricSpec {
    tag: "request_latency",
    header: "Request Latency",
    unit: MetricUnit::Nanoseconds,
    flags: &[],
};

pub const TIME_TO_FIRST_TOKEN: MetricSpec = MetricSpec {
    tag: "time_to_first_token",
    header: "Time To First Token",
    unit: MetricUnit::Nanoseconds,
    flags: &[MetricFlag::StreamingOnly],
};

pub const TIME_TO_SECOND_TOKEN: MetricSpec = MetricSpec {
    tag: "time_to_second_token",
    header: "Time To Second Token",
    unit: MetricUnit::Nanoseconds,
    flags: &[MetricFlag::StreamingOnly],
};

pub const INTER_CHUNK_LATENCY: MetricSpec = MetricSpec {
    tag: "inter_chunk_latency",
    header: "Inter Chunk Latency",
    unit: MetricUnit::Nanoseconds,
    flags: &[MetricFlag::StreamingOnly, MetricFlag::Internal],
};

pub const INTER_TOKEN_LATENCY: MetricSpec = MetricSpec {
    tag: "inter_token_latency",
    header: "Inter Token Latency",
    unit: MetricUnit::Nanoseconds,
    flags: &[MetricFlag::StreamingOnly],
};

pub const INPUT_SEQUENCE_LENGTH: MetricSpec = MetricSpec {
    tag: "input_sequence_length",
    header: "Input Sequence Length",
    unit: MetricUnit::Tokens,
    flags: &[],
};

pub const OUTPUT_SEQUENCE_LENGTH: MetricSpec = MetricSpec {
    tag: "output_sequence_length",
    header: "Output Sequence Length",
    unit: MetricUnit::Tokens,
    flags: &[],
};

pub const OUTPUT_TOKEN_COUNT: MetricSpec = MetricSpec {
    tag: "output_token_count",
    header: "Output Token Count",
    unit: MetricUnit::Tokens,
    flags: &[MetricFlag::Internal],
};

pub const ERROR_ISL: MetricSpec = MetricSpec {
    tag: "error_isl",
    header: "Error Input Sequence Length",
    unit: MetricUnit::Tokens,
    flags: &[MetricFlag::Internal],
};

pub const USAGE_PROMPT_TOKENS: MetricSpec = MetricSpec {
    tag: "usage_prompt_tokens",
    header: "Usage Prompt Tokens",
    unit: MetricUnit::Tokens,
    flags: &[MetricFlag::Experimental],
};

pub const USAGE_COMPLETION_TOKENS: MetricSpec = MetricSpec {
    tag: "usage_completion_tokens",
    header: "Usage Completion Tokens",
    unit: MetricUnit::Tokens,
    flags: &[MetricFlag::Experimental],
};

pub const USAGE_TOTAL_TOKENS: MetricSpec = MetricSpec {
    tag: "usage_total_tokens",
    header: "Usage Total Tokens",
    unit: MetricUnit::Tokens,
    flags: &[MetricFlag::Experimental],
};

pub const USAGE_REASONING_TOKENS: MetricSpec = MetricSpec {
    tag: "usage_reasoning_tokens",
    header: "Usage Reasoning Tokens",
    unit: MetricUnit::Tokens,
    flags: &[MetricFlag::Experimental],
};

pub const GOOD_REQUEST_COUNT: MetricSpec = MetricSpec {
    tag: "good_request_count",
    header: "Good Request Count",
    unit: MetricUnit::Requests,
    flags: &[MetricFlag::Internal],
};

/// Every metric spec this crate's processors can emit, in declaration order.
pub const ALL: &[MetricSpec] = &[
    REQUEST_LATENCY,
    TIME_TO_FIRST_TOKEN,
    TIME_TO_SECOND_TOKEN,
    INTER_CHUNK_LATENCY,
    INTER_TOKEN_LATENCY,
    INPUT_SEQUENCE_LENGTH,
    OUTPUT_SEQUENCE_LENGTH,
    OUTPUT_TOKEN_COUNT,
    ERROR_ISL,
    USAGE_PROMPT_TOKENS,
    USAGE_COMPLETION_TOKENS,
    USAGE_TOTAL_TOKENS,
    USAGE_REASONING_TOKENS,
    GOOD_REQUEST_COUNT,
];

pub fn spec_for(tag: &str) -> Option<MetricSpec> {
    ALL.iter().copied().find(|spec| spec.tag == tag)
}
