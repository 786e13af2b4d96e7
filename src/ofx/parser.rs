use super::TransactionParser;
use crate::error::{AppError, Result};
use crate::models::Transaction;
use crate::models::transaction::{ImportIdGenerator, to_milliunits};
use async_trait::async_trait;
use chrono::NaiveDate;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info, instrument};

/// Reads bank transactions out of OFX statements.
///
/// Handles both OFX 1.x SGML, where leaf elements are not closed, and OFX 2.x XML.
/// Only `<STMTTRN>` aggregates are interpreted; everything else is skipped.
pub struct OfxParser {
    debug: bool,
}

impl OfxParser {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }
}

#[async_trait]
impl TransactionParser for OfxParser {
    #[instrument(name = "Parsing statement", skip_all, fields(path = %file_path.display()))]
    async fn parse(&self, account_id: &str, file_path: &Path) -> Result<Vec<Transaction>> {
        let bytes = tokio::fs::read(file_path).await.map_err(|e| {
            AppError::Parse(format!("Failed to read '{}': {}", file_path.display(), e))
        })?;

        let content = decode_statement(&bytes);
        let transactions = parse_statement(&content, account_id)?;

        for t in &transactions {
            if self.debug {
                info!(date = %t.date, amount = %t.amount, payee = ?t.payee, fitid = ?t.fitid, import_id = %t.import_id, "Parsed transaction");
            } else {
                debug!(date = %t.date, amount = %t.amount, import_id = %t.import_id, "Parsed transaction");
            }
        }

        Ok(transactions)
    }
}

/// Decode a statement using the character set its header declares.
///
/// OFX 1.x headers carry `ENCODING:` and `CHARSET:` lines (Westpac sends `CHARSET:1252`),
/// OFX 2.x files use the XML declaration. Anything unrecognised is read as UTF-8.
fn decode_statement(bytes: &[u8]) -> Cow<'_, str> {
    let (content, _, _) = statement_encoding(bytes).decode(bytes);
    content
}

fn statement_encoding(bytes: &[u8]) -> &'static Encoding {
    // Headers are ASCII, so a lossy view of the prefix is enough to read them
    let header_end = find_ascii_case_insensitive(bytes, b"<OFX>").unwrap_or(bytes.len());
    let header = String::from_utf8_lossy(&bytes[..header_end]);

    if let Some(label) = xml_encoding(&header) {
        return Encoding::for_label(label.as_bytes()).unwrap_or(UTF_8);
    }

    let mut encoding = None;
    let mut charset = None;
    for line in header.lines() {
        if let Some((key, value)) = line.split_once(':') {
            match key.trim().to_ascii_uppercase().as_str() {
                "ENCODING" => encoding = Some(value.trim().to_ascii_uppercase()),
                "CHARSET" => charset = Some(value.trim().to_ascii_uppercase()),
                _ => {}
            }
        }
    }

    if encoding.as_deref() == Some("UTF-8") {
        return UTF_8;
    }

    match charset.as_deref() {
        Some("1252") | Some("ISO-8859-1") | Some("8859-1") => WINDOWS_1252,
        Some(label) => Encoding::for_label(label.as_bytes()).unwrap_or(UTF_8),
        None => UTF_8,
    }
}

fn xml_encoding(header: &str) -> Option<&str> {
    let declaration = header.find("<?xml").map(|start| &header[start..])?;
    let declaration = &declaration[..declaration.find("?>")?];
    let rest = &declaration[declaration.find("encoding=")? + "encoding=".len()..];
    let quote = rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let rest = &rest[1..];
    Some(&rest[..rest.find(quote)?])
}

fn find_ascii_case_insensitive(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Open { tag: String, value: Option<&'a str> },
    Close { tag: String },
}

fn tokenize(body: &str) -> impl Iterator<Item = Token<'_>> {
    body.split('<').filter_map(|segment| {
        let (tag, rest) = segment.split_once('>')?;
        let tag = tag.trim();
        if tag.is_empty() || tag.starts_with('?') || tag.starts_with('!') {
            return None;
        }

        match tag.strip_prefix('/') {
            Some(closing) => Some(Token::Close {
                tag: closing.trim().to_ascii_uppercase(),
            }),
            None => {
                let value = rest.trim();
                Some(Token::Open {
                    tag: tag.to_ascii_uppercase(),
                    value: (!value.is_empty()).then_some(value),
                })
            }
        }
    })
}

#[derive(Default)]
struct PendingTransaction {
    posted: Option<String>,
    amount: Option<String>,
    name: Option<String>,
    memo: Option<String>,
    fitid: Option<String>,
}

impl PendingTransaction {
    fn set(&mut self, tag: &str, value: &str) {
        let field = match tag {
            "DTPOSTED" => &mut self.posted,
            "TRNAMT" => &mut self.amount,
            "NAME" => &mut self.name,
            "MEMO" => &mut self.memo,
            "FITID" => &mut self.fitid,
            _ => return,
        };
        if field.is_none() {
            *field = Some(decode_entities(value));
        }
    }

    fn finish(
        self,
        index: usize,
        account_id: &str,
        import_ids: &mut ImportIdGenerator,
    ) -> Result<Transaction> {
        let posted = self.posted.ok_or_else(|| {
            AppError::Parse(format!("Transaction {} has no DTPOSTED", index))
        })?;
        let date = parse_date(&posted).ok_or_else(|| {
            AppError::Parse(format!(
                "Transaction {} has invalid DTPOSTED '{}'",
                index, posted
            ))
        })?;

        let raw_amount = self.amount.ok_or_else(|| {
            AppError::Parse(format!("Transaction {} has no TRNAMT", index))
        })?;
        let (amount, milliunits) = parse_amount(&raw_amount)
            .and_then(|amount| Some((amount, to_milliunits(amount)?)))
            .ok_or_else(|| {
                AppError::Parse(format!(
                    "Transaction {} has invalid TRNAMT '{}'",
                    index, raw_amount
                ))
            })?;

        Ok(Transaction {
            account_id: account_id.to_string(),
            date,
            amount,
            payee: self.name,
            memo: self.memo,
            fitid: self.fitid,
            import_id: import_ids.next_id(milliunits, date),
        })
    }
}

fn parse_statement(content: &str, account_id: &str) -> Result<Vec<Transaction>> {
    let root = content
        .to_ascii_uppercase()
        .find("<OFX>")
        .ok_or_else(|| AppError::Parse("No <OFX> element found".to_string()))?;

    let mut transactions = Vec::new();
    let mut import_ids = ImportIdGenerator::new();
    let mut pending: Option<PendingTransaction> = None;

    for token in tokenize(&content[root..]) {
        match token {
            Token::Open { tag, .. } if tag == "STMTTRN" => {
                if pending.is_some() {
                    return Err(unterminated(transactions.len() + 1));
                }
                pending = Some(PendingTransaction::default());
            }
            Token::Close { tag } if tag == "STMTTRN" => {
                let transaction = pending
                    .take()
                    .ok_or_else(|| AppError::Parse("Unexpected </STMTTRN>".to_string()))?;
                let index = transactions.len() + 1;
                transactions.push(transaction.finish(index, account_id, &mut import_ids)?);
            }
            Token::Close { tag } if tag == "BANKTRANLIST" && pending.is_some() => {
                return Err(unterminated(transactions.len() + 1));
            }
            Token::Open {
                tag,
                value: Some(value),
            } => {
                if let Some(transaction) = pending.as_mut() {
                    transaction.set(&tag, value);
                }
            }
            _ => {}
        }
    }

    if pending.is_some() {
        return Err(unterminated(transactions.len() + 1));
    }

    Ok(transactions)
}

fn unterminated(index: usize) -> AppError {
    AppError::Parse(format!("Transaction {} is missing </STMTTRN>", index))
}

/// OFX datetimes are `YYYYMMDD[HHMMSS[.XXX]][[+-]TZ[:NAME]]`; only the date is kept.
fn parse_date(value: &str) -> Option<NaiveDate> {
    let date = value.get(..8)?;
    NaiveDate::parse_from_str(date, "%Y%m%d").ok()
}

fn parse_amount(value: &str) -> Option<Decimal> {
    let value = value.trim();
    let value = value.strip_prefix('+').unwrap_or(value);
    Decimal::from_str(&value.replace(',', ".")).ok()
}

fn decode_entities(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
