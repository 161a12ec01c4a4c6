use crate::error::{TableError, TableResult};

/// A `start:stop:step` row selection with the usual slicing rules:
/// negative bounds count from the end, out-of-range bounds are clamped, and a negative step walks
/// backwards.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RowSlice {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: Option<isize>,
}

impl RowSlice {
    pub fn new(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> Self {
        Self { start, stop, step }
    }

    pub fn range(start: isize, stop: isize) -> Self {
        Self::new(Some(start), Some(stop), None)
    }

    pub fn step_by(mut self, step: isize) -> Self {
        self.step = Some(step);
        self
    }

    /// Resolve the slice against a sequence of `len` rows.
    pub fn indices(&self, len: usize) -> TableResult<Vec<usize>> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(TableError::Argument("slice step cannot be zero".to_owned()));
        }
        let len = isize::try_from(len)
            .map_err(|_| TableError::Argument(format!("table too long to slice: {len}")))?;

        let (lower, upper) = if step > 0 { (0, len) } else { (-1, len - 1) };
        let clamp = |bound: Option<isize>, default: isize| match bound {
            None => default,
            Some(b) if b < 0 => (b + len).max(lower),
            Some(b) => b.min(upper),
        };
        let start = clamp(self.start, if step > 0 { lower } else { upper });
        let stop = clamp(self.stop, if step > 0 { upper } else { lower });

        let mut out = Vec::new();
        let mut i = start;
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            // `lower`/`upper` clamping keeps `i` inside `0..len` here.
            out.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
        Ok(out)
    }
}
