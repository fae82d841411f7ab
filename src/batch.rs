use std::io::Cursor;

use polars::prelude::*;

use crate::error::{Result, ServiceError};

/// Parses an uploaded CSV (header row required) into a frame.
pub fn read_csv(bytes: Vec<u8>) -> Result<DataFrame> {
    let df = CsvReader::new(Cursor::new(bytes))
        .has_header(true)
        .finish()?;
    Ok(df)
}

/// Converts every column of `df` to f64 and returns the frame row by row.
///
/// Columns are taken positionally; a cell that is missing or cannot be read
/// as a number is a shape error naming its row and column.
pub fn feature_rows(df: &DataFrame) -> Result<Vec<Vec<f64>>> {
    let nrows = df.height();
    let mut rows: Vec<Vec<f64>> = vec![Vec::with_capacity(df.width()); nrows];

    for series in df.get_columns() {
        let values = series.cast(&DataType::Float64)?;
        for (row, value) in values.f64()?.into_iter().enumerate() {
            let value = value.ok_or_else(|| {
                ServiceError::Shape(format!(
                    "row {} column {:?} is not numeric",
                    row + 1,
                    series.name()
                ))
            })?;
            rows[row].push(value);
        }
    }

    Ok(rows)
}

/// Cell text for every row of `df`, used to render the prediction table.
///
/// Columns are cast to text by polars, so integers and floats keep the form
/// they were read with (`63`, `1.0`).
pub fn display_rows(df: &DataFrame) -> Result<Vec<Vec<String>>> {
    let mut rows: Vec<Vec<String>> = vec![Vec::with_capacity(df.width()); df.height()];

    for series in df.get_columns() {
        let text = series.cast(&DataType::Utf8)?;
        for (row, value) in text.utf8()?.into_iter().enumerate() {
            rows[row].push(value.unwrap_or_default().to_string());
        }
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_in_file_order() {
        let df = read_csv(b"a,b\n1,2.5\n3,4\n".to_vec()).unwrap();
        assert_eq!(df.get_column_names(), vec!["a", "b"]);
        assert_eq!(
            feature_rows(&df).unwrap(),
            vec![vec![1.0, 2.5], vec![3.0, 4.0]]
        );
    }

    #[test]
    fn missing_cell_is_reported() {
        let df = read_csv(b"a,b\n1,\n3,4\n".to_vec()).unwrap();
        match feature_rows(&df) {
            Err(ServiceError::Shape(message)) => assert!(message.contains("row 1")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn display_keeps_float_and_wide_integer_text() {
        let df = read_csv(b"a,b\n9007199254740993,1.0\n".to_vec()).unwrap();
        assert_eq!(
            display_rows(&df).unwrap(),
            vec![vec!["9007199254740993".to_string(), "1.0".to_string()]]
        );
    }

    #[test]
    fn display_keeps_text_and_numbers() {
        let mut df = read_csv(b"a,b\n63,2.3\n".to_vec()).unwrap();
        df.with_column(Series::new("Prediction", vec!["Yes"])).unwrap();
        assert_eq!(
            display_rows(&df).unwrap(),
            vec![vec!["63".to_string(), "2.3".to_string(), "Yes".to_string()]]
        );
    }
}
