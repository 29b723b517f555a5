//! Instrument records and their CSV representation

use crate::error::{EtlError, Result};

/// The six instrument attributes extracted from a FIRDS package, in CSV
/// column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstrumentField {
    Id,
    FullNm,
    ClssfctnTp,
    CmmdtyDerivInd,
    NtnlCcy,
    Issr,
}

impl InstrumentField {
    pub const ALL: [InstrumentField; 6] = [
        InstrumentField::Id,
        InstrumentField::FullNm,
        InstrumentField::ClssfctnTp,
        InstrumentField::CmmdtyDerivInd,
        InstrumentField::NtnlCcy,
        InstrumentField::Issr,
    ];

    /// Column header, identical to the XML local element name
    pub fn as_str(self) -> &'static str {
        match self {
            InstrumentField::Id => "Id",
            InstrumentField::FullNm => "FullNm",
            InstrumentField::ClssfctnTp => "ClssfctnTp",
            InstrumentField::CmmdtyDerivInd => "CmmdtyDerivInd",
            InstrumentField::NtnlCcy => "NtnlCcy",
            InstrumentField::Issr => "Issr",
        }
    }

    /// Fields that live under `FinInstrmGnlAttrbts` in the source document
    pub fn general_attribute(local_name: &[u8]) -> Option<Self> {
        match local_name {
            b"Id" => Some(InstrumentField::Id),
            b"FullNm" => Some(InstrumentField::FullNm),
            b"ClssfctnTp" => Some(InstrumentField::ClssfctnTp),
            b"CmmdtyDerivInd" => Some(InstrumentField::CmmdtyDerivInd),
            b"NtnlCcy" => Some(InstrumentField::NtnlCcy),
            _ => None,
        }
    }
}

impl std::fmt::Display for InstrumentField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Headers of the derived columns, appended after the instrument fields
pub const DERIVED_HEADERS: [&str; 2] = ["a_count", "contains_a"];

/// `YES`/`NO` flag stored in the `contains_a` column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainsA {
    Yes,
    No,
}

impl ContainsA {
    pub fn as_str(self) -> &'static str {
        match self {
            ContainsA::Yes => "YES",
            ContainsA::No => "NO",
        }
    }
}

impl std::str::FromStr for ContainsA {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "YES" => Ok(ContainsA::Yes),
            "NO" => Ok(ContainsA::No),
            other => Err(EtlError::Validation(format!(
                "contains_a must be YES or NO, got {:?}",
                other
            ))),
        }
    }
}

/// Columns computed from `FullNm`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedColumns {
    pub a_count: usize,
    pub contains_a: ContainsA,
}

/// One financial instrument; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub id: Option<String>,
    pub full_nm: Option<String>,
    pub clssfctn_tp: Option<String>,
    pub cmmdty_deriv_ind: Option<String>,
    pub ntnl_ccy: Option<String>,
    pub issr: Option<String>,
    /// Set by the transformer
    pub derived: Option<DerivedColumns>,
}

impl Record {
    pub fn get(&self, field: InstrumentField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    pub fn set(&mut self, field: InstrumentField, value: Option<String>) {
        *self.slot_mut(field) = value;
    }

    fn slot(&self, field: InstrumentField) -> &Option<String> {
        match field {
            InstrumentField::Id => &self.id,
            InstrumentField::FullNm => &self.full_nm,
            InstrumentField::ClssfctnTp => &self.clssfctn_tp,
            InstrumentField::CmmdtyDerivInd => &self.cmmdty_deriv_ind,
            InstrumentField::NtnlCcy => &self.ntnl_ccy,
            InstrumentField::Issr => &self.issr,
        }
    }

    fn slot_mut(&mut self, field: InstrumentField) -> &mut Option<String> {
        match field {
            InstrumentField::Id => &mut self.id,
            InstrumentField::FullNm => &mut self.full_nm,
            InstrumentField::ClssfctnTp => &mut self.clssfctn_tp,
            InstrumentField::CmmdtyDerivInd => &mut self.cmmdty_deriv_ind,
            InstrumentField::NtnlCcy => &mut self.ntnl_ccy,
            InstrumentField::Issr => &mut self.issr,
        }
    }
}

/// Ordered collection of records, in source document order.
///
/// `derived` is set once the transformer has run; the CSV schema then carries
/// the two derived columns as well.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentTable {
    records: Vec<Record>,
    derived: bool,
}

impl InstrumentTable {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            derived: false,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut [Record] {
        &mut self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_derived_columns(&self) -> bool {
        self.derived
    }

    pub(crate) fn mark_derived(&mut self) {
        self.derived = true;
    }

    /// Column headers in output order
    pub fn headers(&self) -> Vec<&'static str> {
        let mut headers: Vec<&'static str> =
            InstrumentField::ALL.iter().map(|f| f.as_str()).collect();
        if self.derived {
            headers.extend(DERIVED_HEADERS);
        }
        headers
    }

    /// Serialize to CSV: header row, schema column order, no index column.
    /// Absent values become empty cells.
    pub fn to_csv_bytes(&self) -> Result<Vec<u8>> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.headers())?;

        for record in &self.records {
            let mut row: Vec<String> = InstrumentField::ALL
                .iter()
                .map(|f| record.get(*f).unwrap_or_default().to_string())
                .collect();

            if self.derived {
                match record.derived {
                    Some(d) => {
                        row.push(d.a_count.to_string());
                        row.push(d.contains_a.as_str().to_string());
                    },
                    None => row.extend([String::new(), String::new()]),
                }
            }

            writer.write_record(&row)?;
        }

        writer
            .into_inner()
            .map_err(|e| EtlError::Io(e.into_error()))
    }

    /// Read back a CSV produced by [`InstrumentTable::to_csv_bytes`]
    pub fn from_csv_reader<R: std::io::Read>(reader: R) -> Result<Self> {
        let mut reader = csv::Reader::from_reader(reader);
        let headers = reader.headers()?.clone();

        let column = |name: &str| headers.iter().position(|h| h == name);
        let mut field_columns = Vec::with_capacity(InstrumentField::ALL.len());
        for field in InstrumentField::ALL {
            let idx = column(field.as_str()).ok_or_else(|| {
                EtlError::Validation(format!("CSV is missing the {} column", field))
            })?;
            field_columns.push((field, idx));
        }

        let derived_columns = match (column(DERIVED_HEADERS[0]), column(DERIVED_HEADERS[1])) {
            (Some(count), Some(flag)) => Some((count, flag)),
            _ => None,
        };

        let mut records = Vec::new();
        for row in reader.records() {
            let row = row?;
            let mut record = Record::default();

            for (field, idx) in &field_columns {
                let value = row.get(*idx).filter(|v| !v.is_empty()).map(str::to_string);
                record.set(*field, value);
            }

            if let Some((count_idx, flag_idx)) = derived_columns {
                let count = row.get(count_idx).unwrap_or_default();
                let flag = row.get(flag_idx).unwrap_or_default();
                if !count.is_empty() {
                    let a_count = count.parse::<usize>().map_err(|e| {
                        EtlError::Validation(format!("invalid a_count {:?}: {}", count, e))
                    })?;
                    record.derived = Some(DerivedColumns {
                        a_count,
                        contains_a: flag.parse()?,
                    });
                }
            }

            records.push(record);
        }

        Ok(Self {
            records,
            derived: derived_columns.is_some(),
        })
    }
}

impl From<Vec<Record>> for InstrumentTable {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}
