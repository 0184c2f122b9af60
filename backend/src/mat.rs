use anyhow::{Result, bail};
use opencv::{
    boxed_ref::BoxedRef,
    core::{Mat, MatTraitConst, MatTraitConstManual, Vec4b},
    imgproc::{COLOR_BGR2BGRA, cvt_color_def},
};
use platforms::capture::Frame;

/// A BGRA [`Mat`] that owns the external buffer.
#[derive(Debug)]
pub struct OwnedMat {
    rows: i32,
    cols: i32,
    bytes: Vec<u8>,
}

impl OwnedMat {
    #[inline]
    pub fn new(frame: Frame) -> Result<Self> {
        let owned = Self {
            rows: frame.height,
            cols: frame.width,
            bytes: frame.data,
        };
        let _ = owned.as_mat_inner()?;

        Ok(owned)
    }

    /// Width and height in pixels.
    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.cols as u32, self.rows as u32)
    }

    pub fn as_mat(&self) -> BoxedRef<'_, Mat> {
        self.as_mat_inner()
            .expect("buffer size validated on construction")
    }

    fn as_mat_inner(&self) -> Result<BoxedRef<'_, Mat>> {
        Ok(Mat::new_rows_cols_with_bytes::<Vec4b>(
            self.rows,
            self.cols,
            &self.bytes,
        )?)
    }
}

impl TryFrom<&Mat> for OwnedMat {
    type Error = anyhow::Error;

    /// Copies a BGR or BGRA `value` into an owned BGRA buffer.
    fn try_from(value: &Mat) -> Result<Self> {
        let bgra = match value.channels() {
            4 => value.try_clone()?,
            3 => {
                let mut bgra = Mat::default();
                cvt_color_def(value, &mut bgra, COLOR_BGR2BGRA)?;
                bgra
            }
            channels => bail!("unsupported channel count {channels}"),
        };
        let bgra = if bgra.is_continuous() {
            bgra
        } else {
            bgra.try_clone()?
        };

        Ok(Self {
            rows: bgra.rows(),
            cols: bgra.cols(),
            bytes: bgra.data_bytes()?.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use opencv::core::{CV_8UC3, Scalar};

    use super::*;

    #[test]
    fn owned_mat_from_bgr_mat() {
        let bgr = Mat::new_rows_cols_with_default(4, 6, CV_8UC3, Scalar::new(1.0, 2.0, 3.0, 0.0))
            .unwrap();

        let owned = OwnedMat::try_from(&bgr).unwrap();

        assert_eq!(owned.size(), (6, 4));
        let pixel = *owned.as_mat().at_2d::<Vec4b>(2, 3).unwrap();
        assert_eq!(pixel.0, [1, 2, 3, 255]);
    }

    #[test]
    fn owned_mat_rejects_short_buffer() {
        let frame = Frame {
            width: 10,
            height: 10,
            data: vec![0; 12],
        };

        assert!(OwnedMat::new(frame).is_err());
    }
}
