use crate::ast::Table;
use serde::{Deserialize, Serialize};
use unicode_width::UnicodeWidthStr;

/// Rendered footprint of table nodes. Width is fixed unless the text of a
/// row would not fit; height grows with the column count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TableMetrics {
    pub char_width: f64,
    pub table_width: f64,
    pub header_height: f64,
    pub row_height: f64,
    pub padding_x: f64,
}

impl Default for TableMetrics {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            table_width: 280.0,
            header_height: 40.0,
            row_height: 40.0,
            padding_x: 16.0,
        }
    }
}

impl TableMetrics {
    pub fn text_width(&self, text: &str) -> f64 {
        let width = UnicodeWidthStr::width(text);
        width as f64 * self.char_width
    }

    pub fn table_size(&self, table: &Table) -> (f64, f64) {
        let header_width = self.text_width(&table.name);

        // name, key marker and type share one row
        let max_row_width = table
            .columns
            .iter()
            .map(|c| {
                self.text_width(&c.name) + self.text_width(&c.type_name) + self.char_width * 4.0
            })
            .fold(0.0, f64::max);

        let content_width = header_width.max(max_row_width) + self.padding_x * 2.0;
        let width = content_width.max(self.table_width);
        let height = self.header_height + table.columns.len() as f64 * self.row_height;

        (width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Column;

    #[test]
    fn test_ascii_width() {
        let m = TableMetrics::default();
        assert_eq!(m.text_width("User"), 4.0 * 8.0);
    }

    #[test]
    fn test_unicode_width() {
        let m = TableMetrics::default();
        // full-width characters count double
        assert_eq!(m.text_width("ユーザー"), 8.0 * 8.0);
    }

    #[test]
    fn test_table_size_no_columns() {
        let m = TableMetrics::default();
        let (w, h) = m.table_size(&Table::new("audit"));
        assert_eq!(w, 280.0);
        assert_eq!(h, 40.0);
    }

    #[test]
    fn test_table_size_grows_with_columns() {
        let m = TableMetrics::default();
        let mut t = Table::new("users");
        t.columns = vec![Column::new("id", "int"), Column::new("name", "varchar")];
        assert_eq!(m.table_size(&t), (280.0, 120.0));
    }

    #[test]
    fn test_wide_column_widens_table() {
        let m = TableMetrics::default();
        let mut t = Table::new("t");
        t.columns = vec![Column::new("a".repeat(40), "timestamp with time zone")];
        let (w, _) = m.table_size(&t);
        assert!(w > 280.0);
    }
}
