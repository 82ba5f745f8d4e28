/// Median of a sample set, averaging the two central values for even counts.
/// Returns `None` for an empty slice. The slice is reordered in place.
pub fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let n = values.len();
    if n % 2 == 0 {
        Some((values[n / 2 - 1] + values[n / 2]) / 2.0)
    } else {
        Some(values[n / 2])
    }
}

/// True when a raster sample carries data (finite and not the nodata marker)
pub fn is_data(value: f64, nodata: Option<f64>) -> bool {
    value.is_finite() && nodata.map_or(true, |nd| value != nd)
}

/// Median of the samples that are finite, non-zero and not nodata.
/// Zero marks "no feature" in distance and masked height rasters, so it never
/// takes part in the median. `None` when nothing is left.
pub fn median_of_valid(values: &[f64], nodata: Option<f64>) -> Option<f64> {
    let mut valid: Vec<f64> = values
        .iter()
        .copied()
        .filter(|&v| v != 0.0 && is_data(v, nodata))
        .collect();
    median(&mut valid)
}

/// Most frequent value among data samples; ties go to the smallest value
pub fn majority<I>(values: I, nodata: Option<f64>) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut data: Vec<f64> = values.into_iter().filter(|&v| is_data(v, nodata)).collect();
    data.sort_by(f64::total_cmp);

    let mut best: Option<(f64, usize)> = None;
    let mut i = 0;
    while i < data.len() {
        let value = data[i];
        let mut j = i;
        while j < data.len() && data[j] == value {
            j += 1;
        }
        let run = j - i;
        // ascending scan keeps the smallest value on ties
        if best.map_or(true, |(_, count)| run > count) {
            best = Some((value, run));
        }
        i = j;
    }
    best.map(|(value, _)| value)
}

/// Share of `count` in `total`, in percent
pub fn percentage(count: usize, total: usize) -> Option<f64> {
    if total == 0 {
        None
    } else {
        Some(count as f64 / total as f64 * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
    }

    #[test]
    fn test_median_of_valid_skips_zero_nan_and_nodata() {
        let values = [0.0, f64::NAN, 5.0, -9999.0, 7.0, 0.0, 9.0];
        assert_eq!(median_of_valid(&values, Some(-9999.0)), Some(7.0));
    }

    #[test]
    fn test_median_of_valid_all_zero() {
        assert_eq!(median_of_valid(&[0.0, 0.0, 0.0], None), None);
    }

    #[test]
    fn test_majority_ties_take_smallest() {
        assert_eq!(majority(vec![3.0, 1.0, 3.0, 1.0, 2.0], None), Some(1.0));
        assert_eq!(majority(vec![1500.0, 1800.0, 1800.0], None), Some(1800.0));
        assert_eq!(majority(vec![-1.0, -1.0, 4.0], Some(-1.0)), Some(4.0));
        assert_eq!(majority(Vec::new(), None), None);
    }

    #[test]
    fn test_ordering_with_negatives_and_signed_zero() {
        // total ordering puts -0.0 before 0.0 and keeps negatives first
        assert_eq!(median(&mut [2.0, -3.0, 0.0, -0.0, 5.0]), Some(0.0));
        assert_eq!(majority(vec![4.0, -2.5, 4.0, -2.5, 1.0], None), Some(-2.5));
        assert_eq!(median(&mut [f64::INFINITY, -1.0, 1.0]), Some(1.0));
    }

    #[test]
    fn test_percentage() {
        assert_eq!(percentage(1, 4), Some(25.0));
        assert_eq!(percentage(0, 0), None);
    }
}
