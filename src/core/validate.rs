// Pluggable line and row checks plus the aggregators that run them.
// Aggregators never short-circuit: every rule runs so every reason is reported.
// An empty aggregator accepts everything.
use crate::core::error::{Error, ErrorKind};

/// A check over one raw physical line, run before tokenizing.
///
/// A line is not necessarily a full record: a quoted field containing a line break
/// spreads one record over several physical lines, and each is checked on its own.
pub trait LineValidator {
    fn validate(&self, line: &str) -> Result<(), Error>;
}

/// A check over one tokenized row.
pub trait RowValidator {
    fn validate(&self, row: &[String]) -> Result<(), Error>;
}

impl<F> LineValidator for F
where
    F: Fn(&str) -> Result<(), Error>,
{
    fn validate(&self, line: &str) -> Result<(), Error> {
        self(line)
    }
}

impl<F> RowValidator for F
where
    F: Fn(&[String]) -> Result<(), Error>,
{
    fn validate(&self, row: &[String]) -> Result<(), Error> {
        self(row)
    }
}

#[derive(Default)]
pub struct LineValidatorAggregator {
    validators: Vec<Box<dyn LineValidator>>,
}

impl LineValidatorAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_validator(&mut self, validator: impl LineValidator + 'static) {
        self.validators.push(Box::new(validator));
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Runs every validator in registration order and merges all failures into one
    /// `Validation` error whose message lists each reason on its own line.
    pub fn validate(&self, line: &str) -> Result<(), Error> {
        if self.validators.is_empty() {
            return Ok(());
        }
        let failures = self
            .validators
            .iter()
            .filter_map(|validator| validator.validate(line).err())
            .collect();
        combine(failures).map_err(|err| err.with_line(line))
    }
}

#[derive(Default)]
pub struct RowValidatorAggregator {
    validators: Vec<Box<dyn RowValidator>>,
}

impl RowValidatorAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_validator(&mut self, validator: impl RowValidator + 'static) {
        self.validators.push(Box::new(validator));
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn validate(&self, row: &[String]) -> Result<(), Error> {
        if self.validators.is_empty() {
            return Ok(());
        }
        let failures = self
            .validators
            .iter()
            .filter_map(|validator| validator.validate(row).err())
            .collect();
        combine(failures)
    }
}

fn combine(failures: Vec<Error>) -> Result<(), Error> {
    if failures.is_empty() {
        return Ok(());
    }
    let message = failures
        .iter()
        .map(|failure| match failure.message() {
            Some(message) => message.to_string(),
            None => failure.to_string(),
        })
        .collect::<Vec<_>>()
        .join("\n");
    Err(Error::new(ErrorKind::Validation)
        .with_message(message)
        .with_related(failures))
}

fn rejected(message: String) -> Error {
    Error::new(ErrorKind::Validation).with_message(message)
}

/// Rejects empty and whitespace-only lines.
#[derive(Clone, Copy, Debug, Default)]
pub struct NotBlank;

impl LineValidator for NotBlank {
    fn validate(&self, line: &str) -> Result<(), Error> {
        if line.trim().is_empty() {
            return Err(rejected("line is blank".to_string()));
        }
        Ok(())
    }
}

/// Rejects lines longer than `max` characters.
#[derive(Clone, Copy, Debug)]
pub struct MaxLength(pub usize);

impl LineValidator for MaxLength {
    fn validate(&self, line: &str) -> Result<(), Error> {
        let len = line.chars().count();
        if len > self.0 {
            return Err(rejected(format!(
                "line is too long: {len} characters (max {})",
                self.0
            )));
        }
        Ok(())
    }
}

/// Rejects lines containing a fixed piece of text.
#[derive(Clone, Debug)]
pub struct ForbiddenText(pub String);

impl LineValidator for ForbiddenText {
    fn validate(&self, line: &str) -> Result<(), Error> {
        if !self.0.is_empty() && line.contains(self.0.as_str()) {
            return Err(rejected(format!("line contains forbidden text {:?}", self.0)));
        }
        Ok(())
    }
}

/// Requires every row to have exactly this many fields.
#[derive(Clone, Copy, Debug)]
pub struct ColumnCount(pub usize);

impl RowValidator for ColumnCount {
    fn validate(&self, row: &[String]) -> Result<(), Error> {
        if row.len() != self.0 {
            return Err(rejected(format!(
                "row has {} columns (expected {})",
                row.len(),
                self.0
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ColumnCount, ForbiddenText, LineValidatorAggregator, MaxLength, NotBlank,
        RowValidatorAggregator,
    };
    use crate::core::error::{Error, ErrorKind};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn empty_aggregator_accepts_anything() {
        let aggregator = LineValidatorAggregator::new();
        assert!(aggregator.is_empty());
        assert!(aggregator.validate("").is_ok());
        assert!(aggregator.validate("anything at all").is_ok());
    }

    #[test]
    fn passing_validators_succeed() {
        let mut aggregator = LineValidatorAggregator::new();
        aggregator.add_validator(NotBlank);
        aggregator.add_validator(MaxLength(32));
        assert!(aggregator.validate("a,b,c").is_ok());
    }

    #[test]
    fn too_long_line_reports_length_rule_only() {
        let mut aggregator = LineValidatorAggregator::new();
        aggregator.add_validator(NotBlank);
        aggregator.add_validator(MaxLength(5));

        let err = aggregator.validate("hello world").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        let message = err.message().expect("message");
        assert!(message.contains("too long"));
        assert!(!message.contains("blank"));
        assert_eq!(err.line(), Some("hello world"));
        assert_eq!(err.related().len(), 1);
    }

    #[test]
    fn blank_line_reports_blank_rule_only() {
        let mut aggregator = LineValidatorAggregator::new();
        aggregator.add_validator(NotBlank);
        aggregator.add_validator(MaxLength(5));

        let err = aggregator.validate("").unwrap_err();
        let message = err.message().expect("message");
        assert!(message.contains("blank"));
        assert!(!message.contains("too long"));
    }

    #[test]
    fn all_failures_are_joined_in_registration_order() {
        let mut aggregator = LineValidatorAggregator::new();
        aggregator.add_validator(MaxLength(3));
        aggregator.add_validator(|_: &str| -> Result<(), Error> {
            Err(Error::new(ErrorKind::Validation).with_message("second rule"))
        });
        aggregator.add_validator(ForbiddenText("bad".to_string()));

        let err = aggregator.validate("a bad line").unwrap_err();
        let lines: Vec<&str> = err.message().unwrap().lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("too long"));
        assert_eq!(lines[1], "second rule");
        assert!(lines[2].contains("forbidden text"));
    }

    #[test]
    fn validators_run_after_an_earlier_failure() {
        let calls = Rc::new(Cell::new(0));
        let mut aggregator = LineValidatorAggregator::new();
        aggregator.add_validator(NotBlank);
        let counter = Rc::clone(&calls);
        aggregator.add_validator(move |_: &str| -> Result<(), Error> {
            counter.set(counter.get() + 1);
            Ok(())
        });

        assert!(aggregator.validate("   ").is_err());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn row_aggregator_checks_column_count() {
        let mut aggregator = RowValidatorAggregator::new();
        assert!(aggregator.validate(&["a".to_string()]).is_ok());

        aggregator.add_validator(ColumnCount(2));
        let row = vec!["a".to_string(), "b".to_string()];
        assert!(aggregator.validate(&row).is_ok());

        let err = aggregator.validate(&row[..1]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.message().unwrap().contains("expected 2"));
    }
}
