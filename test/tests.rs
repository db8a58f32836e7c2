#[cfg(test)]
mod header_tests {
    use crate::{Error, FileEndian, HEADER_SIZE, Header, LABEL_SIZE, MAX_LABELS, Mode};

    #[test]
    fn test_header_defaults() {
        let header = Header::new();
        assert_eq!(header.mode, 2);
        assert_eq!([header.alpha, header.beta, header.gamma], [90.0; 3]);
        assert_eq!([header.mapc, header.mapr, header.maps], [1, 2, 3]);
        assert_eq!(header.ispg, 1);
        assert_eq!(header.nsymbt, 0);
        assert_eq!(header.lskflg, 0);
        assert_eq!(
            header.skew_matrix,
            [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0]
        );
        assert_eq!(&header.map, b"MAP ");
        assert_eq!(header.machst, [0x44, 0x44, 0x00, 0x00]);
        assert_eq!(header.data_offset(), HEADER_SIZE);
    }

    #[test]
    fn test_header_field_offsets() {
        let mut header = Header::new();
        header.nc = 30;
        header.nr = 20;
        header.ns = 10;
        header.start = [-5, 6, 7];
        header.x_length = 30.0;
        header.mapc = 3;
        header.maps = 1;
        header.amax = 2.5;
        header.ispg = 19;
        header.extra[0] = 42;
        header.rms = 0.75;
        header.set_labels(&["first label"]);

        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[0..4], &30i32.to_le_bytes());
        assert_eq!(&bytes[4..8], &20i32.to_le_bytes());
        assert_eq!(&bytes[8..12], &10i32.to_le_bytes());
        assert_eq!(&bytes[12..16], &2u32.to_le_bytes());
        assert_eq!(&bytes[16..20], &(-5i32).to_le_bytes());
        assert_eq!(&bytes[40..44], &30.0f32.to_le_bytes());
        assert_eq!(&bytes[52..56], &90.0f32.to_le_bytes());
        assert_eq!(&bytes[64..68], &3i32.to_le_bytes());
        assert_eq!(&bytes[72..76], &1i32.to_le_bytes());
        assert_eq!(&bytes[80..84], &2.5f32.to_le_bytes());
        assert_eq!(&bytes[88..92], &19i32.to_le_bytes());
        assert_eq!(&bytes[100..104], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[148..152], &42i32.to_le_bytes());
        assert_eq!(&bytes[208..212], b"MAP ");
        assert_eq!(&bytes[212..216], &[0x44, 0x44, 0x00, 0x00]);
        assert_eq!(&bytes[216..220], &0.75f32.to_le_bytes());
        assert_eq!(&bytes[220..224], &1i32.to_le_bytes());
        assert_eq!(&bytes[224..235], b"first label");
        // Used slot is space padded, unused slots are zero
        assert!(bytes[235..304].iter().all(|&b| b == b' '));
        assert!(bytes[304..].iter().all(|&b| b == 0));

        assert_eq!(Header::decode_from_bytes(&bytes), header);
    }

    #[test]
    fn test_decode_big_endian_header() {
        let mut header = Header::new();
        header.nc = 64;
        header.nr = 32;
        header.ns = 16;
        header.mode = 1;
        header.x_length = 128.0;
        header.amean = -0.5;
        header.machst = FileEndian::BIG_ENDIAN_STAMP;

        let bytes = header.to_bytes();
        assert_eq!(&bytes[0..4], &64i32.to_be_bytes());
        assert_eq!(&bytes[84..88], &(-0.5f32).to_be_bytes());

        let decoded = Header::decode_from_bytes(&bytes);
        assert_eq!(decoded.detect_endian(), FileEndian::BigEndian);
        assert_eq!(decoded, header);
        assert_eq!(decoded.validate().unwrap(), Mode::Int16);
    }

    #[test]
    fn test_endian_detection() {
        assert_eq!(
            FileEndian::from_machst(&[0x44, 0x44, 0, 0]),
            FileEndian::LittleEndian
        );
        assert_eq!(
            FileEndian::from_machst(&[0x44, 0x41, 0, 0]),
            FileEndian::LittleEndian
        );
        assert_eq!(
            FileEndian::from_machst(&[0x11, 0x11, 0, 0]),
            FileEndian::BigEndian
        );
    }

    #[test]
    fn test_header_sizes() {
        let mut header = Header::new();
        header.nc = 10;
        header.nr = 20;
        header.ns = 30;
        header.nsymbt = 80;

        assert_eq!(header.voxel_count(), Some(6000));
        assert_eq!(header.data_offset(), 1104);
        assert_eq!(header.extended_header_size(), 80);

        header.mode = 0;
        assert_eq!(header.data_size(), Some(6000));
        header.mode = 4;
        assert_eq!(header.data_size(), Some(48000));
        header.mode = 12;
        assert_eq!(header.data_size(), Some(12000));
        header.mode = 5;
        assert_eq!(header.data_size(), None);
    }

    #[test]
    fn test_validate_rejects_bad_headers() {
        let mut header = Header::new();
        header.map = *b"PAM ";
        assert!(matches!(header.validate(), Err(Error::MalformedHeader(_))));

        let mut header = Header::new();
        header.nr = -1;
        assert!(matches!(header.validate(), Err(Error::MalformedHeader(_))));

        let mut header = Header::new();
        header.mode = 5;
        assert!(matches!(
            header.validate(),
            Err(Error::UnsupportedVoxelMode(5))
        ));
    }

    #[test]
    #[cfg(target_pointer_width = "64")]
    fn test_oversized_dimensions_do_not_overflow() {
        let mut header = Header::new();
        header.nc = i32::MAX;
        header.nr = i32::MAX;
        header.ns = i32::MAX;
        assert_eq!(header.voxel_count(), None);
        assert_eq!(header.data_size(), None);
        assert!(matches!(header.validate(), Err(Error::MalformedHeader(_))));

        // 2^63 voxels fit in the count, but not as float32 bytes
        header.nc = 1 << 21;
        header.nr = 1 << 21;
        header.ns = 1 << 21;
        assert_eq!(header.voxel_count(), Some(1 << 63));
        assert_eq!(header.data_size(), None);
        header.mode = 0;
        assert_eq!(header.data_size(), Some(1 << 63));
        assert_eq!(header.validate().unwrap(), Mode::Int8);
    }

    #[test]
    fn test_labels_round_trip() {
        let mut header = Header::new();
        header.set_labels(&["alpha", "beta  ", "gamma"]);
        assert_eq!(header.nlabl, 3);
        assert_eq!(header.labels(), vec!["alpha", "beta", "gamma"]);

        let long = "x".repeat(LABEL_SIZE + 20);
        header.set_labels(&[long.as_str()]);
        assert_eq!(header.labels(), vec!["x".repeat(LABEL_SIZE)]);
    }

    #[test]
    fn test_label_count_overrun_is_clamped() {
        let mut header = Header::new();
        let texts: Vec<String> = (0..MAX_LABELS).map(|i| format!("label {i}")).collect();
        header.set_labels(&texts);
        header.nlabl = 25;
        assert_eq!(header.labels().len(), MAX_LABELS);

        header.nlabl = -3;
        assert!(header.labels().is_empty());
    }
}

#[cfg(test)]
mod mode_tests {
    use crate::{Error, Mode};

    #[test]
    fn test_mode_codes() {
        for mode in Mode::ALL {
            assert_eq!(Mode::try_from(mode.code()).unwrap(), mode);
        }
        assert_eq!(Mode::from_u32(12), Some(Mode::Float16));
        assert_eq!(Mode::from_u32(5), None);
        assert!(matches!(
            Mode::try_from(7u32),
            Err(Error::UnsupportedVoxelMode(7))
        ));
    }

    #[test]
    fn test_mode_byte_size() {
        assert_eq!(Mode::Int8.byte_size(), 1);
        assert_eq!(Mode::Int16.byte_size(), 2);
        assert_eq!(Mode::Float32.byte_size(), 4);
        assert_eq!(Mode::Int32.byte_size(), 4);
        assert_eq!(Mode::Complex64.byte_size(), 8);
        assert_eq!(Mode::Uint16.byte_size(), 2);
        assert_eq!(Mode::Float16.byte_size(), 2);
    }

    #[test]
    fn test_mode_properties() {
        assert!(Mode::Complex64.is_complex());
        assert!(!Mode::Float32.is_complex());

        assert!(Mode::Int8.is_integer());
        assert!(Mode::Uint16.is_integer());
        assert!(!Mode::Float16.is_integer());
        assert!(!Mode::Complex64.is_integer());

        assert!(Mode::Float32.is_float());
        assert!(Mode::Float16.is_float());
        assert!(!Mode::Int32.is_float());
    }
}

#[cfg(test)]
mod orientation_tests {
    use crate::{Axis, Error, Orientation, PermutationMatrix};

    fn all_orientations() -> Vec<Orientation> {
        ["XYZ", "XZY", "YXZ", "YZX", "ZXY", "ZYX"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect()
    }

    #[test]
    fn test_default_is_xyz() {
        let o = Orientation::default();
        assert_eq!(o, Orientation::XYZ);
        assert_eq!(o.to_integers(), [1, 2, 3]);
        assert_eq!(o.to_string(), "XYZ");
    }

    #[test]
    fn test_integer_round_trip() {
        for o in all_orientations() {
            assert_eq!(Orientation::from_integers(o.to_integers()).unwrap(), o);
            assert_eq!(Orientation::from_axis_order(o.to_axis_order()).unwrap(), o);
            assert_eq!(o.to_string().parse::<Orientation>().unwrap(), o);
        }
    }

    #[test]
    fn test_constructors_agree() {
        let from_axes = Orientation::new(Axis::Z, Axis::X, Axis::Y).unwrap();
        let from_labels = Orientation::from_labels("z", "X", "y").unwrap();
        let from_codes = Orientation::from_integers([3, 1, 2]).unwrap();
        assert_eq!(from_axes, from_labels);
        assert_eq!(from_axes, from_codes);
        assert_eq!(from_axes.cols(), Axis::Z);
        assert_eq!(from_axes.rows(), Axis::X);
        assert_eq!(from_axes.sections(), Axis::Y);
    }

    #[test]
    fn test_invalid_orientations() {
        assert!(matches!(
            Orientation::new(Axis::X, Axis::X, Axis::Z),
            Err(Error::InvalidOrientation(_))
        ));
        assert!(Orientation::from_labels("X", "Y", "W").is_err());
        assert!(Orientation::from_labels("XY", "Z", "X").is_err());
        assert!(Orientation::from_integers([1, 2, 2]).is_err());
        assert!(Orientation::from_integers([0, 1, 2]).is_err());
        assert!(Orientation::from_axis_order([0, 0, 1]).is_err());
        assert!("XY".parse::<Orientation>().is_err());
        assert!("XYZX".parse::<Orientation>().is_err());
    }

    #[test]
    fn test_axis_order() {
        assert_eq!(Orientation::XYZ.to_axis_order(), [0, 1, 2]);
        let zyx: Orientation = "ZYX".parse().unwrap();
        assert_eq!(zyx.to_axis_order(), [2, 1, 0]);
        let yzx: Orientation = "YZX".parse().unwrap();
        assert_eq!(yzx.to_axis_order(), [2, 0, 1]);
    }

    #[test]
    fn test_derive_permutation_matches_codes() {
        for a in all_orientations() {
            for b in all_orientations() {
                let expected =
                    PermutationMatrix::from_orientations(&a.to_integers(), &b.to_integers())
                        .unwrap();
                assert_eq!(a.derive_permutation(&b), expected, "{a} -> {b}");
                assert_eq!(a / b, expected);
            }
        }
    }

    #[test]
    fn test_inverse_permutations() {
        for a in all_orientations() {
            for b in all_orientations() {
                assert!((a / b * (b / a)).is_identity(), "{a} <-> {b}");
            }
        }
    }
}

#[cfg(test)]
mod permutation_tests {
    use crate::{Error, Orientation, PermutationMatrix, VoxelGrid};
    use ndarray::Array3;

    fn all_orientations() -> Vec<Orientation> {
        ["XYZ", "XZY", "YXZ", "YZX", "ZXY", "ZYX"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect()
    }

    #[test]
    fn test_from_orientations() {
        let p = PermutationMatrix::from_orientations(&[1, 2, 3], &[3, 2, 1]).unwrap();
        assert_eq!(p.as_array(), [[0, 0, 1], [0, 1, 0], [1, 0, 0]]);
        assert_eq!(p.to_string(), "[0 0 1]\n[0 1 0]\n[1 0 0]\n");

        let p = PermutationMatrix::from_orientations(&[1, 2, 3], &[2, 3, 1]).unwrap();
        assert_eq!(p.as_array(), [[0, 0, 1], [1, 0, 0], [0, 1, 0]]);
    }

    #[test]
    fn test_from_orientations_errors() {
        assert!(matches!(
            PermutationMatrix::from_orientations(&[1, 1, 3], &[1, 2, 3]),
            Err(Error::DuplicateAxis(_))
        ));
        assert!(matches!(
            PermutationMatrix::from_orientations(&[1, 2, 3], &[1, 2, 4]),
            Err(Error::AxisSetMismatch { .. })
        ));
        assert!(matches!(
            PermutationMatrix::from_orientations(&[1, 2], &[1, 2, 3]),
            Err(Error::ShapeMismatch {
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn test_new_validates() {
        let p = PermutationMatrix::new([[0, 1, 0], [1, 0, 0], [0, 0, 1]]).unwrap();
        assert_eq!(p.get(0, 1), 1);
        assert_eq!(p.get(0, 0), 0);

        for bad in [
            [[1, 1, 0], [0, 0, 0], [0, 0, 1]],
            [[1, 0, 0], [1, 0, 0], [0, 0, 1]],
            [[2, 0, 0], [0, 1, 0], [0, 0, 0]],
            [[1, 0, 0], [0, 1, 0], [0, 0, 0]],
            [[1, 0, 0], [0, -1, 0], [0, 0, 1]],
        ] {
            assert!(
                matches!(PermutationMatrix::new(bad), Err(Error::InvalidPermutation(m)) if m == bad)
            );
        }
    }

    #[test]
    fn test_vector_products() {
        let p = PermutationMatrix::from_orientations(&[1, 2, 3], &[2, 3, 1]).unwrap();
        let v = [10, 20, 30];
        // v . P moves old[i] to its position in the new ordering
        assert_eq!(p.right_mul(&v).unwrap(), [20, 30, 10]);
        assert_eq!(p.left_mul(&v).unwrap(), [30, 10, 20]);
        assert_eq!(p.transpose().right_mul(&p.right_mul(&v).unwrap()).unwrap(), v);
        assert!(matches!(
            p.right_mul(&[1.0, 2.0]),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_composition() {
        let p = PermutationMatrix::from_orientations(&[1, 2, 3], &[2, 1, 3]).unwrap();
        let q = PermutationMatrix::from_orientations(&[2, 1, 3], &[3, 1, 2]).unwrap();
        let direct = PermutationMatrix::from_orientations(&[1, 2, 3], &[3, 1, 2]).unwrap();
        assert_eq!(p * q, direct);

        let mut acc = PermutationMatrix::identity();
        acc *= p;
        acc *= q;
        assert_eq!(acc, direct);
        assert!((direct * direct.transpose()).is_identity());
    }

    #[test]
    fn test_swap_sequence_reversal_restores_array() {
        let data = Array3::from_shape_fn((2, 3, 4), |(s, r, c)| (s * 100 + r * 10 + c) as i32);
        for a in all_orientations() {
            for b in all_orientations() {
                let mut grid = VoxelGrid::from(data.clone());
                let swaps = (a / b).swap_sequence();
                for &(i, j) in swaps {
                    grid.swap_axes(i, j);
                }
                for &(i, j) in swaps.iter().rev() {
                    grid.swap_axes(i, j);
                }
                assert_eq!(grid.as_array::<i32>(), Some(&data));
            }
        }
    }

    #[test]
    fn test_swap_sequence_lengths() {
        let lengths: Vec<usize> = all_orientations()
            .iter()
            .map(|o| (Orientation::XYZ / *o).swap_sequence().len())
            .collect();
        assert_eq!(lengths, vec![0, 1, 1, 2, 2, 1]);
    }

    /// Value stored for logical coordinate (x, y, z).
    fn tag(x: usize, y: usize, z: usize) -> i32 {
        (x + 10 * y + 100 * z) as i32
    }

    #[test]
    fn test_permute_preserves_content() {
        // (z, y, x) extents 2, 3, 4
        let xyz = Array3::from_shape_fn((2, 3, 4), |(z, y, x)| tag(x, y, z));
        for target in all_orientations() {
            let mut grid = VoxelGrid::from(xyz.clone());
            grid.permute(&(Orientation::XYZ / target));
            let array = grid.as_array::<i32>().unwrap();

            for ((s, r, c), &value) in array.indexed_iter() {
                let mut coord = [0usize; 3];
                coord[target.cols().code() as usize - 1] = c;
                coord[target.rows().code() as usize - 1] = r;
                coord[target.sections().code() as usize - 1] = s;
                assert_eq!(value, tag(coord[0], coord[1], coord[2]), "XYZ -> {target}");
            }
        }
    }

    #[test]
    fn test_permute_chain_preserves_content() {
        let xyz = Array3::from_shape_fn((2, 3, 4), |(z, y, x)| tag(x, y, z));
        let mut grid = VoxelGrid::from(xyz.clone());
        let mut current = Orientation::XYZ;
        for next in ["ZXY", "YXZ", "XZY", "ZYX", "YZX", "XYZ"] {
            let next: Orientation = next.parse().unwrap();
            grid.permute(&(current / next));
            current = next;
        }
        assert_eq!(grid.as_array::<i32>(), Some(&xyz));
    }
}
