use corner_merge::blending::{composite_masked, darken};
use corner_merge::geometry::corner_box;
use corner_merge::mask::{feather_mask, ramp, Edges, FeatherSpec};
use image::{GrayImage, Luma, Rgba, RgbaImage};
use proptest::prelude::*;

fn arb_image(max: u32) -> impl Strategy<Value = RgbaImage> {
    (1..=max, 1..=max).prop_flat_map(|(w, h)| {
        prop::collection::vec(any::<u8>(), (w * h * 4) as usize)
            .prop_map(move |buf| RgbaImage::from_raw(w, h, buf).expect("buffer matches size"))
    })
}

fn arb_image_pair(max: u32) -> impl Strategy<Value = (RgbaImage, RgbaImage)> {
    (1..=max, 1..=max).prop_flat_map(|(w, h)| {
        let n = (w * h * 4) as usize;
        (
            prop::collection::vec(any::<u8>(), n),
            prop::collection::vec(any::<u8>(), n),
        )
            .prop_map(move |(a, b)| {
                (
                    RgbaImage::from_raw(w, h, a).expect("buffer matches size"),
                    RgbaImage::from_raw(w, h, b).expect("buffer matches size"),
                )
            })
    })
}

/// A destination, a patch that fits inside it, and a valid offset.
fn arb_placement(max: u32) -> impl Strategy<Value = (RgbaImage, RgbaImage, u32, u32)> {
    arb_image(max).prop_flat_map(|dest| {
        let (w, h) = dest.dimensions();
        (1..=w, 1..=h).prop_flat_map(move |(pw, ph)| {
            let dest = dest.clone();
            (
                prop::collection::vec(any::<u8>(), (pw * ph * 4) as usize),
                0..=w - pw,
                0..=h - ph,
            )
                .prop_map(move |(buf, ox, oy)| {
                    let patch = RgbaImage::from_raw(pw, ph, buf).expect("buffer matches size");
                    (dest.clone(), patch, ox, oy)
                })
        })
    })
}

fn arb_edges() -> impl Strategy<Value = Edges> {
    (any::<bool>(), any::<bool>(), any::<bool>(), any::<bool>()).prop_map(
        |(top, left, bottom, right)| Edges {
            top,
            left,
            bottom,
            right,
        },
    )
}

proptest! {
    #[test]
    fn corner_box_is_anchored_and_square(
        w in 1u32..5000,
        h in 1u32..5000,
        frac in 0.0f64..=1.0,
    ) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let size = ((f64::from(w.min(h)) * frac) as u32).max(1);
        let r = corner_box(w, h, size).unwrap();
        prop_assert_eq!((r.right, r.bottom), (w, h));
        prop_assert_eq!(r.area(), u64::from(size) * u64::from(size));
    }

    #[test]
    fn ramp_is_monotonic_from_zero(distance in 1u32..2000) {
        let r = ramp(distance);
        prop_assert_eq!(r.len(), distance as usize);
        prop_assert_eq!(r[0], 0);
        prop_assert!(r.windows(2).all(|w| w[0] <= w[1]));
        let last = f64::from(r[r.len() - 1]);
        prop_assert!(255.0 - last <= 255.0 / f64::from(distance) + 0.5);
    }

    #[test]
    fn combined_fade_never_exceeds_single_fades(
        w in 1u32..64,
        h in 1u32..64,
        distance in 1u32..40,
        edges in arb_edges(),
    ) {
        let combined = feather_mask(w, h, &FeatherSpec { edges, distance }).unwrap();
        let vertical = feather_mask(w, h, &FeatherSpec {
            edges: Edges { left: false, right: false, ..edges },
            distance,
        }).unwrap();
        let horizontal = feather_mask(w, h, &FeatherSpec {
            edges: Edges { top: false, bottom: false, ..edges },
            distance,
        }).unwrap();
        for (x, y, px) in combined.enumerate_pixels() {
            let v = vertical.get_pixel(x, y)[0];
            let hz = horizontal.get_pixel(x, y)[0];
            prop_assert_eq!(px[0], v.min(hz));
        }
    }

    #[test]
    fn darken_is_commutative((a, b) in arb_image_pair(16)) {
        prop_assert_eq!(darken(&a, &b).unwrap(), darken(&b, &a).unwrap());
    }

    #[test]
    fn composite_identities_hold((dest, patch, ox, oy) in arb_placement(24)) {
        let (pw, ph) = patch.dimensions();

        let mut untouched = dest.clone();
        composite_masked(&mut untouched, &patch, &GrayImage::from_pixel(pw, ph, Luma([0])), ox, oy).unwrap();
        prop_assert_eq!(&untouched, &dest);

        let mut replaced = dest.clone();
        composite_masked(&mut replaced, &patch, &GrayImage::from_pixel(pw, ph, Luma([255])), ox, oy).unwrap();
        for (x, y, px) in replaced.enumerate_pixels() {
            let inside = x >= ox && x < ox + pw && y >= oy && y < oy + ph;
            let expected: &Rgba<u8> = if inside {
                patch.get_pixel(x - ox, y - oy)
            } else {
                dest.get_pixel(x, y)
            };
            prop_assert_eq!(px, expected);
        }
    }
}
