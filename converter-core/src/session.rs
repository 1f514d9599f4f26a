use chrono::{Local, NaiveDateTime};
use std::io::{self, BufRead, Write};
use tracing::{debug, info};

use crate::{
    convert::convert,
    error::InputError,
    model::{ConversionRecord, RateTable, SupportedCurrency},
};

/// Typed at a prompt (any case) to end the session.
pub const EXIT_KEYWORD: &str = "exit";

#[derive(Debug, Clone, PartialEq)]
enum State {
    PromptFrom,
    PromptTo { from: String },
    PromptAmount { from: String, to: String },
    Compute { from: String, to: String, amount: f64 },
    Exit,
}

/// Interactive conversion loop over a fixed rate table.
///
/// Records accumulate inside the session and are handed back with
/// [`Session::into_records`] once the loop is over.
pub struct Session<'a> {
    rates: &'a RateTable,
    records: Vec<ConversionRecord>,
    clock: fn() -> NaiveDateTime,
}

impl<'a> Session<'a> {
    pub fn new(rates: &'a RateTable) -> Self {
        Self { rates, records: Vec::new(), clock: local_now }
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn records(&self) -> &[ConversionRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ConversionRecord> {
        self.records
    }

    /// Run prompts until the exit keyword or end of input.
    ///
    /// On an I/O error the records completed so far stay in the session.
    pub fn run<R: BufRead, W: Write>(&mut self, mut input: R, mut output: W) -> io::Result<()> {
        writeln!(output, "Welcome to the currency converter.")?;
        writeln!(output, "To exit, type \"{EXIT_KEYWORD}\" at any prompt.")?;

        let mut state = State::PromptFrom;
        while state != State::Exit {
            state = self.step(state, &mut input, &mut output)?;
        }

        output.flush()?;
        info!(count = self.records.len(), "Conversion session finished");
        Ok(())
    }

    fn step<R: BufRead, W: Write>(
        &mut self,
        state: State,
        input: &mut R,
        output: &mut W,
    ) -> io::Result<State> {
        let next = match state {
            State::PromptFrom => {
                writeln!(output, "===============================================")?;
                write_currency_prompt(output, "Enter the code of the currency to convert from:")?;

                match read_line(input)? {
                    None => State::Exit,
                    Some(line) if is_exit(&line) => State::Exit,
                    Some(line) => match parse_currency(self.rates, &line) {
                        Ok(from) => State::PromptTo { from },
                        Err(err) => {
                            debug!(%err, "Rejected source currency");
                            writeln!(output, "Unrecognized or unsupported currency.")?;
                            State::PromptFrom
                        }
                    },
                }
            }
            State::PromptTo { from } => {
                write_currency_prompt(output, "Now, enter the code of the currency to convert to:")?;

                match read_line(input)? {
                    None => State::Exit,
                    Some(line) if is_exit(&line) => State::Exit,
                    Some(line) => match parse_currency(self.rates, &line) {
                        Ok(to) => State::PromptAmount { from, to },
                        Err(err) => {
                            debug!(%err, "Rejected target currency");
                            writeln!(output, "Unrecognized or unsupported currency.")?;
                            State::PromptTo { from }
                        }
                    },
                }
            }
            State::PromptAmount { from, to } => {
                writeln!(output, "Enter the amount to be converted:")?;

                match read_line(input)? {
                    None => State::Exit,
                    Some(line) if is_exit(&line) => State::Exit,
                    Some(line) => match parse_amount(&line) {
                        Ok(amount) => State::Compute { from, to, amount },
                        Err(err) => {
                            debug!(%err, "Rejected amount");
                            writeln!(output, "Invalid value. Please enter a valid number.")?;
                            State::PromptFrom
                        }
                    },
                }
            }
            State::Compute { from, to, amount } => {
                match self.convert(&from, &to, amount) {
                    Ok(record) => {
                        writeln!(
                            output,
                            "{:.2} {} is equivalent to {:.2} {}",
                            record.from_amount,
                            record.from_currency,
                            record.to_amount,
                            record.to_currency,
                        )?;
                    }
                    Err(err) => {
                        debug!(%err, "Conversion rejected");
                        writeln!(output, "Invalid value. Please enter a valid number.")?;
                    }
                }
                State::PromptFrom
            }
            State::Exit => State::Exit,
        };

        Ok(next)
    }

    /// Convert and record one transaction. Codes must be normalized.
    ///
    /// A result that does not fit in an `f64` is rejected and not recorded.
    pub fn convert(
        &mut self,
        from: &str,
        to: &str,
        amount: f64,
    ) -> Result<ConversionRecord, InputError> {
        let (from_rate, to_rate) = self.rates.rate_pair(from, to)?;
        let converted = convert(amount, from_rate, to_rate);

        if !converted.is_finite() {
            return Err(InputError::InvalidAmount(amount.to_string()));
        }

        debug!(from, to, amount, converted, "Converted amount");

        let record = ConversionRecord {
            timestamp: (self.clock)(),
            from_currency: from.to_string(),
            from_amount: amount,
            to_currency: to.to_string(),
            to_amount: converted,
        };
        self.records.push(record.clone());

        Ok(record)
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Whether `input` is the exit keyword, ignoring case and surrounding space.
pub fn is_exit(input: &str) -> bool {
    input.trim().eq_ignore_ascii_case(EXIT_KEYWORD)
}

/// Normalize a currency code and check it against the rate table.
pub fn parse_currency(rates: &RateTable, input: &str) -> Result<String, InputError> {
    let code = input.trim().to_uppercase();
    if rates.contains(&code) {
        Ok(code)
    } else {
        Err(InputError::UnknownCurrency(code))
    }
}

/// Parse a finite, non-negative amount.
pub fn parse_amount(input: &str) -> Result<f64, InputError> {
    let trimmed = input.trim();
    match trimmed.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount >= 0.0 => Ok(amount),
        _ => Err(InputError::InvalidAmount(trimmed.to_string())),
    }
}

/// Read one line; bytes that are not UTF-8 are replaced so validation can reject them.
fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    if input.read_until(b'\n', &mut buf)? == 0 {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&buf).trim().to_string()))
}

fn write_currency_prompt<W: Write>(output: &mut W, heading: &str) -> io::Result<()> {
    writeln!(output, "{heading}")?;
    for currency in SupportedCurrency::all() {
        writeln!(output, "  {currency}")?;
    }
    Ok(())
}
