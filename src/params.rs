use std::borrow::Cow;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::DalError;
use crate::mapping::NativeType;
use crate::types::{DbType, DbValue, ParameterDirection, Provider};

/// A command parameter, already translated to one provider's native type.
///
/// Built through [`crate::Connector::create_parameter`] (or
/// [`DbParameter::new`]); binding is positional, in slice order, so the name is
/// only used for diagnostics and to label output values.
#[derive(Debug, Clone, PartialEq)]
pub struct DbParameter {
    name: String,
    db_type: DbType,
    native: NativeType,
    size: usize,
    value: DbValue,
    direction: ParameterDirection,
}

impl DbParameter {
    /// Map `db_type` for `provider` and build the parameter.
    ///
    /// # Errors
    /// Returns [`DalError::ParameterError`] if the provider has no native type
    /// for `db_type`.
    pub fn new(
        provider: Provider,
        name: impl Into<String>,
        db_type: DbType,
        size: usize,
        value: impl Into<DbValue>,
        direction: ParameterDirection,
    ) -> Result<Self, DalError> {
        let native = NativeType::map(provider, db_type)?;
        Ok(Self {
            name: name.into(),
            db_type,
            native,
            size,
            value: value.into(),
            direction,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn db_type(&self) -> DbType {
        self.db_type
    }

    #[must_use]
    pub fn native_type(&self) -> NativeType {
        self.native
    }

    #[must_use]
    pub fn provider(&self) -> Provider {
        self.native.provider()
    }

    /// Declared size; for character and binary outputs it bounds the buffer.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn value(&self) -> &DbValue {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<DbValue>) {
        self.value = value.into();
    }

    #[must_use]
    pub fn direction(&self) -> ParameterDirection {
        self.direction
    }

    fn mismatch(&self, wanted: &str) -> DalError {
        DalError::ParameterError(format!(
            "parameter '{}' ({}): cannot bind a {} value as {wanted}",
            self.name,
            self.native,
            self.value.kind()
        ))
    }

    /// Value as a 64-bit integer; `None` for NULL.
    ///
    /// # Errors
    /// Returns [`DalError::ParameterError`] if the value is not integral.
    pub fn int_value(&self) -> Result<Option<i64>, DalError> {
        match &self.value {
            DbValue::Null => Ok(None),
            DbValue::Int(i) => Ok(Some(*i)),
            DbValue::Bool(b) => Ok(Some(i64::from(*b))),
            #[allow(clippy::cast_possible_truncation)]
            DbValue::Float(f) if f.fract() == 0.0 && f.is_finite() => Ok(Some(*f as i64)),
            DbValue::Text(s) => s.trim().parse().map(Some).map_err(|_| self.mismatch("integer")),
            _ => Err(self.mismatch("integer")),
        }
    }

    /// Integer value narrowed to `T`, with a range check.
    ///
    /// # Errors
    /// Returns [`DalError::ParameterError`] if the value is not integral or does
    /// not fit.
    pub fn narrow_int<T: TryFrom<i64>>(&self) -> Result<Option<T>, DalError> {
        self.int_value()?
            .map(|i| {
                T::try_from(i).map_err(|_| {
                    DalError::ParameterError(format!(
                        "parameter '{}' ({}): value {i} is out of range",
                        self.name, self.native
                    ))
                })
            })
            .transpose()
    }

    /// # Errors
    /// Returns [`DalError::ParameterError`] if the value is not numeric.
    pub fn float_value(&self) -> Result<Option<f64>, DalError> {
        match &self.value {
            DbValue::Null => Ok(None),
            DbValue::Float(f) => Ok(Some(*f)),
            #[allow(clippy::cast_precision_loss)]
            DbValue::Int(i) => Ok(Some(*i as f64)),
            DbValue::Text(s) => s.trim().parse().map(Some).map_err(|_| self.mismatch("float")),
            _ => Err(self.mismatch("float")),
        }
    }

    /// # Errors
    /// Returns [`DalError::ParameterError`] if the value has no boolean reading.
    pub fn bool_value(&self) -> Result<Option<bool>, DalError> {
        match &self.value {
            DbValue::Null => Ok(None),
            DbValue::Bool(b) => Ok(Some(*b)),
            DbValue::Int(0) => Ok(Some(false)),
            DbValue::Int(1) => Ok(Some(true)),
            DbValue::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Ok(Some(true)),
                "false" | "0" => Ok(Some(false)),
                _ => Err(self.mismatch("boolean")),
            },
            _ => Err(self.mismatch("boolean")),
        }
    }

    /// Textual rendering of any scalar value; dates use ISO-8601.
    ///
    /// # Errors
    /// Returns [`DalError::ParameterError`] for binary values.
    pub fn text_value(&self) -> Result<Option<Cow<'_, str>>, DalError> {
        let text = match &self.value {
            DbValue::Null => return Ok(None),
            DbValue::Text(s) => Cow::Borrowed(s.as_str()),
            DbValue::Bool(b) => Cow::Owned(b.to_string()),
            DbValue::Int(i) => Cow::Owned(i.to_string()),
            DbValue::Float(f) => Cow::Owned(f.to_string()),
            DbValue::Date(d) => Cow::Owned(d.format("%Y-%m-%d").to_string()),
            DbValue::Time(t) => Cow::Owned(t.format("%H:%M:%S%.f").to_string()),
            DbValue::Timestamp(ts) => Cow::Owned(ts.format("%Y-%m-%d %H:%M:%S%.f").to_string()),
            DbValue::Json(json) => Cow::Owned(json.to_string()),
            DbValue::Blob(_) => return Err(self.mismatch("text")),
        };
        Ok(Some(text))
    }

    /// # Errors
    /// Returns [`DalError::ParameterError`] if the value is not a date.
    pub fn date_value(&self) -> Result<Option<NaiveDate>, DalError> {
        if self.value.is_null() {
            return Ok(None);
        }
        self.value.as_date().map(Some).ok_or_else(|| self.mismatch("date"))
    }

    /// # Errors
    /// Returns [`DalError::ParameterError`] if the value is not a time of day.
    pub fn time_value(&self) -> Result<Option<NaiveTime>, DalError> {
        match &self.value {
            DbValue::Null => Ok(None),
            DbValue::Time(t) => Ok(Some(*t)),
            DbValue::Timestamp(ts) => Ok(Some(ts.time())),
            DbValue::Text(s) => NaiveTime::parse_from_str(s.trim(), "%H:%M:%S%.f")
                .map(Some)
                .map_err(|_| self.mismatch("time")),
            _ => Err(self.mismatch("time")),
        }
    }

    /// # Errors
    /// Returns [`DalError::ParameterError`] if the value is not a timestamp.
    pub fn timestamp_value(&self) -> Result<Option<NaiveDateTime>, DalError> {
        if self.value.is_null() {
            return Ok(None);
        }
        self.value
            .as_timestamp()
            .map(Some)
            .ok_or_else(|| self.mismatch("timestamp"))
    }

    /// Timestamp with a UTC offset. Timestamps without one are taken as UTC;
    /// text must be RFC 3339.
    ///
    /// # Errors
    /// Returns [`DalError::ParameterError`] if the value is not a timestamp.
    pub fn offset_timestamp_value(&self) -> Result<Option<DateTime<FixedOffset>>, DalError> {
        match &self.value {
            DbValue::Null => Ok(None),
            DbValue::Timestamp(ts) => Ok(Some(ts.and_utc().fixed_offset())),
            DbValue::Text(text) => DateTime::parse_from_rfc3339(text.trim())
                .map(Some)
                .map_err(|_| self.mismatch("RFC 3339 timestamp")),
            _ => Err(self.mismatch("timestamp with offset")),
        }
    }

    /// # Errors
    /// Returns [`DalError::ParameterError`] for values other than blobs and text.
    pub fn bytes_value(&self) -> Result<Option<Cow<'_, [u8]>>, DalError> {
        match &self.value {
            DbValue::Null => Ok(None),
            DbValue::Blob(bytes) => Ok(Some(Cow::Borrowed(bytes.as_slice()))),
            DbValue::Text(s) => Ok(Some(Cow::Borrowed(s.as_bytes()))),
            _ => Err(self.mismatch("binary")),
        }
    }
}

/// Reject parameters built for another provider.
///
/// # Errors
/// Returns [`DalError::ParameterError`] naming the first offending parameter.
pub(crate) fn check_provider(params: &[DbParameter], provider: Provider) -> Result<(), DalError> {
    match params.iter().find(|p| p.provider() != provider) {
        Some(p) => Err(DalError::ParameterError(format!(
            "parameter '{}' was created for {}, but the connection uses {provider}",
            p.name(),
            p.provider()
        ))),
        None => Ok(()),
    }
}

/// Reject output directions on backends that cannot read them back.
///
/// # Errors
/// Returns [`DalError::Unimplemented`] naming the first output parameter.
pub(crate) fn require_input_only(params: &[DbParameter], provider: Provider) -> Result<(), DalError> {
    match params.iter().find(|p| p.direction() != ParameterDirection::Input) {
        Some(p) => Err(DalError::Unimplemented(format!(
            "{:?} parameter '{}' is not supported by the {provider} connector",
            p.direction(),
            p.name()
        ))),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(db_type: DbType, value: impl Into<DbValue>) -> DbParameter {
        DbParameter::new(
            Provider::SqlServer,
            "p",
            db_type,
            0,
            value,
            ParameterDirection::Input,
        )
        .unwrap()
    }

    #[test]
    fn narrowing_checks_range() {
        assert_eq!(param(DbType::Int32, 7).narrow_int::<i32>().unwrap(), Some(7));
        let err = param(DbType::Int32, i64::from(i32::MAX) + 1)
            .narrow_int::<i32>()
            .unwrap_err();
        assert!(matches!(err, DalError::ParameterError(ref m) if m.contains("out of range")));
    }

    #[test]
    fn text_coerces_to_numbers_and_dates() {
        assert_eq!(param(DbType::Int64, "42").int_value().unwrap(), Some(42));
        assert_eq!(param(DbType::Double, "1.5").float_value().unwrap(), Some(1.5));
        assert_eq!(
            param(DbType::Date, "2024-02-29").date_value().unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29)
        );
        assert!(param(DbType::Int32, "seven").int_value().is_err());
    }

    #[test]
    fn null_is_none_for_every_reading() {
        let p = param(DbType::String, DbValue::Null);
        assert_eq!(p.text_value().unwrap(), None);
        assert_eq!(p.int_value().unwrap(), None);
        assert_eq!(p.timestamp_value().unwrap(), None);
        assert_eq!(p.bytes_value().unwrap(), None);
    }

    #[test]
    fn parameters_from_another_provider_are_rejected() {
        let params = vec![param(DbType::String, "x")];
        assert!(check_provider(&params, Provider::SqlServer).is_ok());
        let err = check_provider(&params, Provider::Oracle).unwrap_err();
        assert!(matches!(err, DalError::ParameterError(_)));
    }

    #[test]
    fn offset_timestamps_keep_their_zone() {
        let p = param(DbType::DateTimeOffset, "2024-01-01T00:00:00+02:00");
        let ts = p.offset_timestamp_value().unwrap().unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 7200);

        let naive = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let p = param(DbType::DateTimeOffset, naive);
        let ts = p.offset_timestamp_value().unwrap().unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 0);
        assert_eq!(ts.naive_utc(), naive);

        assert!(param(DbType::DateTimeOffset, "yesterday").offset_timestamp_value().is_err());
    }
}
