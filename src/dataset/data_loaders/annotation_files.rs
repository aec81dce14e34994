use crate::dataset::errors::{DatasetError, DatasetResult};
use ndarray::Array2;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

fn open_lines(path: &Path) -> DatasetResult<impl Iterator<Item = std::io::Result<String>>> {
    let file = File::open(path).map_err(|source| DatasetError::Configuration {
        path: path.to_owned(),
        source,
    })?;
    Ok(BufReader::new(file).lines())
}

/// Reads one relative image path per line, stripped. Blank lines are skipped.
pub fn read_image_list<P: AsRef<Path>>(path: P) -> DatasetResult<Vec<String>> {
    let path = path.as_ref();
    let mut img_list = vec![];
    for line in open_lines(path)? {
        let line = line.map_err(|source| DatasetError::Configuration {
            path: path.to_owned(),
            source,
        })?;
        let line = line.trim();
        if !line.is_empty() {
            img_list.push(line.to_string());
        }
    }
    Ok(img_list)
}

/// Parses a whitespace separated numeric matrix, one row per line.
/// Blank lines and `#` comments are ignored, every row must have the same number of columns.
pub fn read_matrix<P: AsRef<Path>>(path: P) -> DatasetResult<Array2<f64>> {
    read_rows(path.as_ref(), None)
}

/// Like [`read_matrix`] but keeps only the first `nb_columns` values of every row.
/// Rows may be longer than that, the extra values are not even parsed.
pub fn read_matrix_columns<P: AsRef<Path>>(path: P, nb_columns: usize) -> DatasetResult<Array2<f64>> {
    read_rows(path.as_ref(), Some(nb_columns))
}

fn read_rows(path: &Path, nb_columns: Option<usize>) -> DatasetResult<Array2<f64>> {
    let mut values: Vec<f64> = vec![];
    let mut nb_rows = 0;
    let mut row_width: Option<usize> = None;
    for (line_index, line) in open_lines(path)?.enumerate() {
        let line_nb = line_index + 1;
        let line = line.map_err(|source| DatasetError::Configuration {
            path: path.to_owned(),
            source,
        })?;
        // # Means comment
        let content = match line.find('#') {
            Some(comment_start) => &line[..comment_start],
            None => line.as_str(),
        };
        let content = content.trim();
        if content.is_empty() {
            continue;
        }

        let tokens: Vec<&str> = content.split_whitespace().collect();
        let tokens = match nb_columns {
            Some(wanted) if tokens.len() < wanted => {
                return Err(DatasetError::data_format(
                    path,
                    line_nb,
                    format!("expected at least {} columns, found {}", wanted, tokens.len()),
                ));
            }
            Some(wanted) => &tokens[..wanted],
            None => &tokens[..],
        };

        match row_width {
            None => row_width = Some(tokens.len()),
            Some(width) if width != tokens.len() => {
                return Err(DatasetError::data_format(
                    path,
                    line_nb,
                    format!("expected {} columns like the previous rows, found {}", width, tokens.len()),
                ));
            }
            Some(_) => {}
        }

        for token in tokens {
            let value: f64 = token.parse().map_err(|_| {
                DatasetError::data_format(path, line_nb, format!("'{}' is not a number", token))
            })?;
            values.push(value);
        }
        nb_rows += 1;
    }

    let shape = (nb_rows, row_width.unwrap_or(0));
    Array2::from_shape_vec(shape, values)
        .map_err(|e| DatasetError::data_format(path, 0, format!("cannot build matrix: {}", e)))
}
