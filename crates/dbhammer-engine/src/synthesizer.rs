//! Random argument synthesis.
//!
//! Every parameter gets one value drawn from a type-driven rule. Nullable
//! parameters are nulled one time in `null_one_in` unless their name marks
//! them as paging/limit inputs or identity keys, and non-nullable parameters
//! that end up null are replaced with a zero value for their type.

use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use dbhammer_core::{
    ParameterMetadata, ProcedureMetadata, SqlType, SqlValue, SynthesisConfig, SynthesizedCall,
};
use rand::Rng;
use uuid::Uuid;

const TOKEN_LEN: usize = 32;
const MAX_DAY_OFFSET: i64 = 365;
const MAX_SECOND_OFFSET: i64 = 30_000;

/// Generates argument values for procedure parameters.
#[derive(Debug, Clone)]
pub struct ParameterSynthesizer {
    null_one_in: u32,
    exempt_fragments: Vec<String>,
    always_required: Vec<String>,
}

impl ParameterSynthesizer {
    pub fn new(config: &SynthesisConfig) -> Self {
        Self {
            null_one_in: config.null_one_in.max(1),
            exempt_fragments: config
                .exempt_name_fragments
                .iter()
                .map(|fragment| fragment.to_ascii_lowercase())
                .filter(|fragment| !fragment.is_empty())
                .collect(),
            always_required: config
                .always_required
                .iter()
                .map(|name| normalize_name(name))
                .collect(),
        }
    }

    /// True when `name` must never be nulled by the random roll.
    ///
    /// Names are compared case-insensitively and without a leading `@`, so
    /// `@AccountID` and `accountid` are the same parameter.
    pub fn is_null_exempt(&self, name: &str) -> bool {
        let normalized = normalize_name(name);
        self.always_required.iter().any(|req| *req == normalized)
            || self
                .exempt_fragments
                .iter()
                .any(|fragment| normalized.contains(fragment.as_str()))
    }

    /// Raw generated value, before zero substitution. May be `Null`.
    pub fn synthesize<R: Rng + ?Sized>(&self, param: &ParameterMetadata, rng: &mut R) -> SqlValue {
        if param.is_nullable
            && !self.is_null_exempt(&param.name)
            && rng.gen_range(1..=self.null_one_in) == 1
        {
            return SqlValue::Null;
        }
        generate(param, rng)
    }

    /// Value that goes into the call payload. Never null for a non-nullable
    /// parameter of a recognized type.
    pub fn argument_for<R: Rng + ?Sized>(&self, param: &ParameterMetadata, rng: &mut R) -> SqlValue {
        let value = self.synthesize(param, rng);
        if value.is_null() && !param.is_nullable {
            return SqlValue::zero_for(&param.sql_type).unwrap_or(SqlValue::Null);
        }
        value
    }

    pub fn synthesize_call<R: Rng + ?Sized>(
        &self,
        procedure: Arc<ProcedureMetadata>,
        rng: &mut R,
    ) -> SynthesizedCall {
        let arguments = procedure
            .parameters
            .iter()
            .map(|param| (param.name.clone(), self.argument_for(param, rng)))
            .collect();
        SynthesizedCall::new(procedure, arguments)
    }
}

impl Default for ParameterSynthesizer {
    fn default() -> Self {
        Self::new(&SynthesisConfig::default())
    }
}

fn normalize_name(name: &str) -> String {
    name.trim().trim_start_matches('@').to_ascii_lowercase()
}

fn generate<R: Rng + ?Sized>(param: &ParameterMetadata, rng: &mut R) -> SqlValue {
    match &param.sql_type {
        SqlType::Int => SqlValue::Int(rng.gen_range(1..100_000)),
        SqlType::BigInt => {
            let a: i64 = rng.gen_range(1..100_000);
            let b: i64 = rng.gen_range(1..1_000);
            SqlValue::BigInt(a * b)
        }
        SqlType::VarChar | SqlType::NVarChar | SqlType::Char | SqlType::NChar => {
            SqlValue::Text(random_token(param.max_length, rng))
        }
        SqlType::DateTime | SqlType::SmallDateTime | SqlType::DateTime2 => {
            let days = rng.gen_range(0..MAX_DAY_OFFSET);
            let seconds = rng.gen_range(-MAX_SECOND_OFFSET..=MAX_SECOND_OFFSET);
            let instant = Utc::now() - ChronoDuration::days(days) + ChronoDuration::seconds(seconds);
            SqlValue::DateTime(instant.naive_utc())
        }
        SqlType::Date => {
            let days = rng.gen_range(0..MAX_DAY_OFFSET);
            SqlValue::Date((Utc::now() - ChronoDuration::days(days)).date_naive())
        }
        SqlType::Decimal | SqlType::Numeric | SqlType::Money => {
            SqlValue::Decimal(rng.gen_range(0.0..10_000.0))
        }
        SqlType::Float => SqlValue::Float(rng.gen_range(0.0f32..10_000.0)),
        SqlType::Bit => SqlValue::Bit(rng.gen_bool(0.5)),
        SqlType::UniqueIdentifier => SqlValue::Uuid(random_uuid(rng)),
        SqlType::TinyInt => SqlValue::TinyInt(rng.gen()),
        SqlType::SignedTinyInt => SqlValue::SignedTinyInt(rng.gen()),
        SqlType::SmallInt => SqlValue::SmallInt(rng.gen_range(i16::MIN..i16::MAX)),
        SqlType::Unrecognized(_) => SqlValue::Null,
    }
}

fn random_uuid<R: Rng + ?Sized>(rng: &mut R) -> Uuid {
    uuid::Builder::from_random_bytes(rng.gen()).into_uuid()
}

/// 32 lowercase hex digits, cut to `max_length` characters when it is set
/// and shorter.
fn random_token<R: Rng + ?Sized>(max_length: u32, rng: &mut R) -> String {
    let mut token = random_uuid(rng).simple().to_string();
    let limit = max_length as usize;
    if limit > 0 && limit < TOKEN_LEN {
        token.truncate(limit);
    }
    token
}
