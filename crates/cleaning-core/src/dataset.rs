use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use polars::prelude::*;

use crate::error::Result;

/// Loads a headed CSV with every column kept as text, so values the filters never
/// look at are written back exactly as they were read. Empty cells become nulls.
pub fn read_csv(path: &Path) -> Result<DataFrame> {
    let content = std::fs::read(path)?;
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(content))
        .finish()?;
    Ok(df)
}

/// Writes `df` with a header row and no index column, replacing any existing file.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut file = File::create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(df)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_columns_survive_a_round_trip_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.csv");
        let output = dir.path().join("out.csv");
        let original = "id,name,price,last_review\n\
                        2539,Clean & quiet apt,149,2018-10-19\n\
                        2595,\"Skylit Midtown Castle, NYC\",225.00,\n\
                        3647,THE VILLAGE OF HARLEM,0150,2019-05-21\n";
        std::fs::write(&input, original).unwrap();

        let mut df = read_csv(&input).unwrap();
        assert_eq!(df.height(), 3);
        assert!(df.dtypes().iter().all(|dtype| *dtype == DataType::String));

        write_csv(&mut df, &output).unwrap();
        assert_eq!(std::fs::read_to_string(&output).unwrap(), original);
    }
}
