use super::*;

fn size(w: u32, h: u32) -> SurfaceSize {
    SurfaceSize::new(w, h).unwrap()
}

#[test]
fn textures_round_trip_pixels() {
    let ctx = EmulatedGpuContext::new();
    let tex = ctx.create_texture(size(2, 1)).unwrap();
    ctx.write_texture(tex, &[1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
    assert_eq!(ctx.read_texture(tex).unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);

    let copy = ctx.copy_texture(tex).unwrap();
    assert_ne!(copy, tex);
    assert_eq!(ctx.read_texture(copy).unwrap(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    assert_eq!(ctx.live_textures(), 2);

    ctx.delete_texture(tex);
    ctx.delete_texture(tex);
    assert_eq!(ctx.live_textures(), 1);
}

#[test]
fn write_rejects_wrong_length() {
    let ctx = EmulatedGpuContext::new();
    let tex = ctx.create_texture(size(2, 2)).unwrap();
    assert!(ctx.write_texture(tex, &[0; 4]).is_err());
}

#[test]
fn injected_allocation_failures_are_consumed() {
    let ctx = EmulatedGpuContext::new();
    ctx.fail_next_allocations(1);
    let err = ctx.create_texture(size(4, 4)).unwrap_err();
    assert!(matches!(err, BridgeError::Allocation(_)));
    assert!(ctx.create_texture(size(4, 4)).is_ok());
}

#[test]
fn memory_budget_limits_allocation() {
    let ctx = EmulatedGpuContext::new();
    ctx.set_max_texture_bytes(Some(64));
    assert!(ctx.create_texture(size(4, 4)).is_ok());
    assert!(ctx.create_texture(size(1, 1)).is_err());
}

#[test]
fn lost_context_fails_everything_but_delete() {
    let ctx = EmulatedGpuContext::new();
    let tex = ctx.create_texture(size(1, 1)).unwrap();
    ctx.lose_context();
    assert!(ctx.is_context_lost());
    assert!(ctx.read_texture(tex).unwrap_err().is_context_lost());
    assert!(ctx.create_texture(size(1, 1)).unwrap_err().is_context_lost());
    assert!(ctx.gen_sync_token().unwrap_err().is_context_lost());
    ctx.delete_texture(tex);
    assert_eq!(ctx.live_textures(), 0);
}

#[test]
fn mailboxes_are_unique_and_resolvable() {
    let ctx = EmulatedGpuContext::new();
    let tex = ctx.create_texture(size(1, 1)).unwrap();
    ctx.write_texture(tex, &[9, 8, 7, 255]).unwrap();
    let a = ctx.produce_mailbox(tex).unwrap();
    let b = ctx.produce_mailbox(tex).unwrap();
    assert_ne!(a, b);
    assert_eq!(ctx.consume_mailbox(&a).unwrap(), vec![9, 8, 7, 255]);

    ctx.delete_texture(tex);
    assert!(ctx.consume_mailbox(&a).is_err());
}

#[test]
fn sync_tokens_increase_and_are_recorded_when_waited() {
    let ctx = EmulatedGpuContext::new();
    let t1 = ctx.gen_sync_token().unwrap();
    let t2 = ctx.gen_sync_token().unwrap();
    assert!(t2.release_count > t1.release_count);
    ctx.wait_sync_token(&t2);
    assert_eq!(ctx.waited_sync_tokens(), vec![t2]);
}
