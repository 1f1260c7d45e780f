use super::*;

#[test]
fn surface_size_rejects_zero_and_oversized() {
    assert!(SurfaceSize::new(0, 10).is_err());
    assert!(SurfaceSize::new(10, 0).is_err());
    assert!(SurfaceSize::new(70_000, 10).is_err());
    let s = SurfaceSize::new(300, 150).unwrap();
    assert_eq!(s.pixel_count(), 45_000);
    assert_eq!(s.byte_len(), 180_000);
    assert_eq!(s.as_u16().unwrap(), (300, 150));
}

#[test]
fn premul_scales_color_by_alpha() {
    let p = Rgba8::new(255, 128, 0, 128).to_premul();
    assert_eq!(p.a, 128);
    assert_eq!(p.r, 128);
    assert_eq!(p.g, 64);
    assert_eq!(p.b, 0);
    assert_eq!(Rgba8::new(9, 9, 9, 0).to_premul(), Rgba8Premul::transparent());
}

#[test]
fn opaque_surfaces_start_black() {
    assert_eq!(OpacityMode::Opaque.initial_color().to_array(), [0, 0, 0, 255]);
    assert_eq!(OpacityMode::NonOpaque.initial_color().to_array(), [0, 0, 0, 0]);
}

#[test]
fn modes_use_snake_case_names() {
    let s = serde_json::to_string(&AccelerationHint::PreferNoAcceleration).unwrap();
    assert_eq!(s, "\"prefer_no_acceleration\"");
    let m: AccelerationMode = serde_json::from_str("\"force\"").unwrap();
    assert_eq!(m, AccelerationMode::Force);
}
