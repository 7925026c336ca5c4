use std::borrow::Cow;

/// A trait for vector-like types that can hold the constants of a program.
///
/// This trait provides a common interface for different vector implementations,
/// allowing them to be used interchangeably as the constants sequence. The
/// evaluator only reads the constants, once per call, through [`Vector::values`].
///
/// # Examples
///
/// ```rust
/// use agraph_eval::prelude::Vector;
///
/// let constants = vec![3.14, 10.0];
/// assert_eq!(constants.values().as_ref(), &[3.14, 10.0]);
/// assert_eq!(Vector::len(&constants), 2);
///
/// let fixed = [1.0, 2.0, 3.0];
/// assert_eq!(Vector::len(&fixed), 3);
/// ```
pub trait Vector {
    /// Returns the vector's data as a contiguous slice, copying only when the
    /// storage is not contiguous.
    fn values(&self) -> Cow<'_, [f64]>;

    /// Returns the length of the vector.
    fn len(&self) -> usize;

    /// Checks if the vector is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Vector for [f64] {
    fn values(&self) -> Cow<'_, [f64]> {
        Cow::Borrowed(self)
    }

    fn len(&self) -> usize {
        <[f64]>::len(self)
    }
}

impl Vector for Vec<f64> {
    fn values(&self) -> Cow<'_, [f64]> {
        Cow::Borrowed(self.as_slice())
    }

    fn len(&self) -> usize {
        Vec::len(self)
    }
}

/// Implementation of Vector trait for fixed-size arrays.
///
/// # Type Parameters
/// * `N` - The fixed size of the array
impl<const N: usize> Vector for [f64; N] {
    fn values(&self) -> Cow<'_, [f64]> {
        Cow::Borrowed(self.as_slice())
    }

    fn len(&self) -> usize {
        N
    }
}

/// Implementation of Vector trait for ndarray's Array1<f64>.
///
/// Strided arrays are copied into a contiguous buffer.
#[cfg(feature = "ndarray")]
impl Vector for ndarray::Array1<f64> {
    fn values(&self) -> Cow<'_, [f64]> {
        match self.as_slice() {
            Some(slice) => Cow::Borrowed(slice),
            None => Cow::Owned(self.to_vec()),
        }
    }

    fn len(&self) -> usize {
        ndarray::Array1::len(self)
    }
}

/// Implementation of Vector trait for nalgebra's DVector<f64>.
#[cfg(feature = "nalgebra")]
impl Vector for nalgebra::DVector<f64> {
    fn values(&self) -> Cow<'_, [f64]> {
        Cow::Borrowed(self.as_slice())
    }

    fn len(&self) -> usize {
        nalgebra::DVector::len(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_borrowed_values() {
        let constants = vec![3.14, 10.0];
        assert!(matches!(constants.values(), Cow::Borrowed(_)));

        let slice: &[f64] = &constants;
        assert_eq!(Vector::len(slice), 2);
        assert_eq!(slice.values().as_ref(), &[3.14, 10.0]);

        let empty: [f64; 0] = [];
        assert!(Vector::is_empty(&empty));
    }

    #[cfg(feature = "ndarray")]
    #[test]
    fn test_ndarray_vector() {
        let array = ndarray::Array1::from(vec![1.0, 2.0, 3.0]);
        assert_eq!(array.values().as_ref(), &[1.0, 2.0, 3.0]);
        assert_eq!(Vector::len(&array), 3);
    }

    #[cfg(feature = "nalgebra")]
    #[test]
    fn test_nalgebra_vector() {
        let vector = nalgebra::DVector::from_vec(vec![1.0, 2.0]);
        assert_eq!(vector.values().as_ref(), &[1.0, 2.0]);
    }
}
