use super::*;
use crate::gpu::emulated::EmulatedGpuContext;

#[derive(Default)]
struct RecordingSink {
    released: Mutex<Vec<(Mailbox, bool)>>,
}

impl ReleaseSink for RecordingSink {
    fn handoff_released(&self, mailbox: Mailbox, resource_lost: bool) {
        self.released.lock().push((mailbox, resource_lost));
    }
}

fn size() -> SurfaceSize {
    SurfaceSize::new(4, 4).unwrap()
}

fn exported(
    emu: &Arc<EmulatedGpuContext>,
    recycler: &Arc<TextureRecycler>,
    sink: &Arc<RecordingSink>,
) -> (ReleaseCallback, TextureId) {
    let ctx: Arc<dyn GpuContext> = emu.clone();
    let texture = ctx.create_texture(size()).unwrap();
    let mailbox = ctx.produce_mailbox(texture).unwrap();
    let weak: Weak<RecordingSink> = Arc::downgrade(sink);
    let cb = ReleaseCallback::new(
        mailbox,
        size(),
        Some((ctx, texture)),
        Arc::clone(recycler),
        weak,
    );
    (cb, texture)
}

#[test]
fn release_waits_on_the_token_and_recycles() {
    let emu = EmulatedGpuContext::new();
    let recycler = TextureRecycler::new(2);
    let sink = Arc::new(RecordingSink::default());
    let (cb, texture) = exported(&emu, &recycler, &sink);

    let token = emu.gen_sync_token().unwrap();
    cb.run(Some(token), false);
    assert!(cb.has_run());
    assert_eq!(emu.waited_sync_tokens(), vec![token]);
    assert!(emu.has_texture(texture));
    assert_eq!(recycler.take(emu.id(), size()), Some(texture));
    assert_eq!(sink.released.lock().as_slice(), &[(cb.mailbox(), false)]);
}

#[test]
fn lost_resources_are_deleted_not_recycled() {
    let emu = EmulatedGpuContext::new();
    let recycler = TextureRecycler::new(2);
    let sink = Arc::new(RecordingSink::default());
    let (cb, texture) = exported(&emu, &recycler, &sink);

    cb.run(None, true);
    assert!(!emu.has_texture(texture));
    assert_eq!(recycler.len(), 0);
    assert_eq!(sink.released.lock().as_slice(), &[(cb.mailbox(), true)]);
}

#[test]
fn second_run_is_ignored() {
    let emu = EmulatedGpuContext::new();
    let recycler = TextureRecycler::new(2);
    let sink = Arc::new(RecordingSink::default());
    let (cb, _) = exported(&emu, &recycler, &sink);

    cb.run(None, false);
    cb.clone().run(None, true);
    assert_eq!(recycler.len(), 1);
    assert_eq!(sink.released.lock().len(), 1);
}

#[test]
fn dropping_an_unrun_callback_deletes_the_texture() {
    let emu = EmulatedGpuContext::new();
    let recycler = TextureRecycler::new(2);
    let sink = Arc::new(RecordingSink::default());
    let (cb, texture) = exported(&emu, &recycler, &sink);
    let mailbox = cb.mailbox();

    drop(cb);
    assert!(!emu.has_texture(texture));
    assert_eq!(recycler.len(), 0);
    assert_eq!(sink.released.lock().as_slice(), &[(mailbox, false)]);
}

#[test]
fn release_after_the_producer_is_gone_still_cleans_up() {
    let emu = EmulatedGpuContext::new();
    let recycler = TextureRecycler::new(2);
    let sink = Arc::new(RecordingSink::default());
    let (cb, texture) = exported(&emu, &recycler, &sink);

    drop(sink);
    recycler.close();
    cb.run(None, false);
    assert!(!emu.has_texture(texture));
}

#[test]
fn recycler_respects_capacity_and_context() {
    let emu = EmulatedGpuContext::new();
    let other = EmulatedGpuContext::new();
    let recycler = TextureRecycler::new(1);

    let a = emu.create_texture(size()).unwrap();
    let b = emu.create_texture(size()).unwrap();
    recycler.put(emu.clone(), size(), a);
    recycler.put(emu.clone(), size(), b);
    assert_eq!(recycler.len(), 1);
    assert!(!emu.has_texture(b));

    assert_eq!(recycler.take(other.id(), size()), None);
    assert_eq!(recycler.take(emu.id(), SurfaceSize::new(8, 8).unwrap()), None);

    recycler.purge_except(Some(other.id()));
    assert!(!emu.has_texture(a));
    assert_eq!(recycler.len(), 0);
}
