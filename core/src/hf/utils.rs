/// Maps `func` over `items` with the item index, in parallel when the rayon feature
/// is enabled. Output order matches input order.
#[inline(always)]
pub(crate) fn par_map<T, U, F>(items: &[T], func: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    F: Fn(usize, &T) -> U + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};

        items
            .par_iter()
            .enumerate()
            .map(|(i, item)| func(i, item))
            .collect()
    }

    #[cfg(not(feature = "rayon"))]
    {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| func(i, item))
            .collect()
    }
}

/// Runs `func` on every item with its index, in parallel when the rayon feature is
/// enabled, collecting the results in input order.
#[inline(always)]
pub(crate) fn par_for_each_mut<T, U, F>(items: &mut [T], func: F) -> Vec<U>
where
    T: Send,
    U: Send,
    F: Fn(usize, &mut T) -> U + Sync + Send,
{
    #[cfg(feature = "rayon")]
    {
        use rayon::iter::{IndexedParallelIterator, IntoParallelRefMutIterator, ParallelIterator};

        items
            .par_iter_mut()
            .enumerate()
            .map(|(i, item)| func(i, item))
            .collect()
    }

    #[cfg(not(feature = "rayon"))]
    {
        items
            .iter_mut()
            .enumerate()
            .map(|(i, item)| func(i, item))
            .collect()
    }
}

/// a + b, point-wise over the length of a
pub(crate) fn add(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b).map(|(x, y)| x + y).collect()
}

/// (1 - damping) new + damping old, point-wise
pub(crate) fn damp(new: &[f64], old: &[f64], damping: f64) -> Vec<f64> {
    new.iter()
        .zip(old)
        .map(|(n, o)| (1.0 - damping) * n + damping * o)
        .collect()
}

/// Index and value of the largest entry, preferring later entries on ties
pub(crate) fn worst(values: impl IntoIterator<Item = f64>) -> Option<(usize, f64)> {
    values
        .into_iter()
        .enumerate()
        .fold(None, |acc, (i, x)| match acc {
            Some((_, best)) if x < best => acc,
            _ => Some((i, x)),
        })
}
