/// Online mean and variance of a stream of values.
#[derive(Debug, Clone)]
pub struct Accumulator {
    n_vals: usize,
    mean: f64,
    diff_2_sum: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccumulatorReport {
    pub n_vals: usize,
    pub mean: f64,
    pub std_dev: f64,
}

impl Accumulator {
    pub fn new() -> Self {
        Self {
            n_vals: 0,
            mean: 0.0,
            diff_2_sum: 0.0,
        }
    }

    pub fn add(&mut self, val: f64) {
        self.n_vals += 1;

        let diff_a = val - self.mean;
        self.mean += diff_a / self.n_vals as f64;

        let diff_b = val - self.mean;
        self.diff_2_sum += diff_a * diff_b;
    }

    pub fn report(&self) -> AccumulatorReport {
        AccumulatorReport {
            n_vals: self.n_vals,
            mean: if self.n_vals > 0 { self.mean } else { f64::NAN },
            std_dev: if self.n_vals > 1 {
                (self.diff_2_sum / (self.n_vals as f64 - 1.0)).sqrt()
            } else {
                f64::NAN
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_and_std_dev() {
        let mut acc = Accumulator::new();
        for val in [10.0, 20.0, 30.0] {
            acc.add(val);
        }
        let report = acc.report();
        assert_eq!(report.n_vals, 3);
        assert!((report.mean - 20.0).abs() < 1e-12);
        assert!((report.std_dev - 10.0).abs() < 1e-12);
    }

    #[test]
    fn few_values() {
        let report = Accumulator::new().report();
        assert_eq!(report.n_vals, 0);
        assert!(report.mean.is_nan());
        assert!(report.std_dev.is_nan());

        let mut acc = Accumulator::new();
        acc.add(5.0);
        let report = acc.report();
        assert_eq!(report.mean, 5.0);
        assert!(report.std_dev.is_nan());
    }
}
