// In-memory table model: one header plus the data rows that follow it.

/// Ordered field names taken from the first input row.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Header {
    names: Vec<String>,
}

impl Header {
    pub fn new(names: Vec<String>) -> Self {
        Self { names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Header {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// One data row. Its length comes from the CSV quoting rules alone and may
/// differ from the header length.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Row {
    values: Vec<String>,
    line: Option<u64>,
}

impl Row {
    pub fn new(values: Vec<String>) -> Self {
        Self { values, line: None }
    }

    pub fn with_line(mut self, line: u64) -> Self {
        self.line = Some(line);
        self
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Input line the row started on, when it came from the reader.
    pub fn line(&self) -> Option<u64> {
        self.line
    }
}

impl<S: Into<String>> FromIterator<S> for Row {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Table {
    pub header: Header,
    pub rows: Vec<Row>,
}
