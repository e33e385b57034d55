//! End-to-end coverage of the public `Machine` surface and the `extern "C"`
//! boundary, driving requests through the token wire format rather than the
//! arena API directly.

use galaxy_vm::expr::AtomKind;
use galaxy_vm::limits::Limits;
use galaxy_vm::machine::Machine;

fn tag(kind: AtomKind) -> i64 {
    kind.tag()
}

#[test]
fn arithmetic_addition() {
    // ap(ap(add, 3), 4) -> 7
    let request = [
        tag(AtomKind::Ap),
        tag(AtomKind::Ap),
        tag(AtomKind::Add),
        tag(AtomKind::Number),
        3,
        tag(AtomKind::Number),
        4,
        tag(AtomKind::Gg),
    ];
    let mut m = Machine::new(Limits::default());
    let response = m.evaluate(&request).unwrap();
    assert_eq!(response, vec![tag(AtomKind::Number), 7, tag(AtomKind::Gg)]);
}

#[test]
fn pair_selection_with_car_and_cdr() {
    // ap(car, ap(ap(cons, 1), 2)) -> 1
    let car_request = [
        tag(AtomKind::Ap),
        tag(AtomKind::Car),
        tag(AtomKind::Ap),
        tag(AtomKind::Ap),
        tag(AtomKind::Cons),
        tag(AtomKind::Number),
        1,
        tag(AtomKind::Number),
        2,
        tag(AtomKind::Gg),
    ];
    let mut m = Machine::new(Limits::default());
    let response = m.evaluate(&car_request).unwrap();
    assert_eq!(response, vec![tag(AtomKind::Number), 1, tag(AtomKind::Gg)]);

    // ap(cdr, ap(ap(cons, 1), 2)) -> 2
    let cdr_request = [
        tag(AtomKind::Ap),
        tag(AtomKind::Cdr),
        tag(AtomKind::Ap),
        tag(AtomKind::Ap),
        tag(AtomKind::Cons),
        tag(AtomKind::Number),
        1,
        tag(AtomKind::Number),
        2,
        tag(AtomKind::Gg),
    ];
    let mut m = Machine::new(Limits::default());
    let response = m.evaluate(&cdr_request).unwrap();
    assert_eq!(response, vec![tag(AtomKind::Number), 2, tag(AtomKind::Gg)]);
}

#[test]
fn boolean_select_with_t_and_f() {
    // ap(ap(t, 5), 9) -> 5 (t selects the argument applied to it first)
    let t_request = [
        tag(AtomKind::Ap),
        tag(AtomKind::Ap),
        tag(AtomKind::T),
        tag(AtomKind::Number),
        5,
        tag(AtomKind::Number),
        9,
        tag(AtomKind::Gg),
    ];
    let mut m = Machine::new(Limits::default());
    let response = m.evaluate(&t_request).unwrap();
    assert_eq!(response, vec![tag(AtomKind::Number), 5, tag(AtomKind::Gg)]);

    // ap(ap(f, 5), 9) -> 9
    let f_request = [
        tag(AtomKind::Ap),
        tag(AtomKind::Ap),
        tag(AtomKind::F),
        tag(AtomKind::Number),
        5,
        tag(AtomKind::Number),
        9,
        tag(AtomKind::Gg),
    ];
    let mut m = Machine::new(Limits::default());
    let response = m.evaluate(&f_request).unwrap();
    assert_eq!(response, vec![tag(AtomKind::Number), 9, tag(AtomKind::Gg)]);
}

#[test]
fn s_combinator_distributes_its_argument() {
    // ap(ap(ap(s, add), i), 5) -> add 5 (i 5) -> 10
    let request = [
        tag(AtomKind::Ap),
        tag(AtomKind::Ap),
        tag(AtomKind::Ap),
        tag(AtomKind::S),
        tag(AtomKind::Add),
        tag(AtomKind::I),
        tag(AtomKind::Number),
        5,
        tag(AtomKind::Gg),
    ];
    let mut m = Machine::new(Limits::default());
    let response = m.evaluate(&request).unwrap();
    assert_eq!(response, vec![tag(AtomKind::Number), 10, tag(AtomKind::Gg)]);
}

#[test]
fn interactive_step_against_the_bundled_default_image() {
    // ap(galaxy, 77), with no program ever `load`ed, lazily runs the
    // bundled default image and echoes `77` back in a `(continue, [77])`
    // shaped tuple.
    let request = [
        tag(AtomKind::Ap),
        tag(AtomKind::Galaxy),
        tag(AtomKind::Number),
        77,
        tag(AtomKind::Gg),
    ];
    let mut m = Machine::new(Limits::default());
    let response = m.evaluate(&request).unwrap();

    assert_eq!(response[0], tag(AtomKind::Ap));
    assert_eq!(*response.last().unwrap(), tag(AtomKind::Gg));
    assert!(response.windows(2).any(|w| w[0] == tag(AtomKind::Number) && w[1] == 77));
    assert!(m.entry_point().is_some());
}

#[test]
fn rom_reset_through_the_ffi_boundary_falls_back_to_the_default_image() {
    // A custom program defines `galaxy = i`, so `ap(galaxy, 3) -> 3`.
    let image = [
        tag(AtomKind::Scan),
        4,
        tag(AtomKind::Galaxy),
        0,
        tag(AtomKind::Def),
        tag(AtomKind::I),
        tag(AtomKind::Gg),
    ];
    let request = [
        tag(AtomKind::Ap),
        tag(AtomKind::Galaxy),
        tag(AtomKind::Number),
        3,
        tag(AtomKind::Gg),
    ];

    unsafe {
        galaxy_vm::ffi::load_machine(image.as_ptr());
        let out = galaxy_vm::ffi::evaluate(request.len() as u32, request.as_ptr());
        let decoded = read_sentinel_terminated(out);
        assert_eq!(decoded, [tag(AtomKind::Number), 3, tag(AtomKind::Gg)]);

        // A null image releases the custom program; the next call falls
        // back to the bundled default image, which wraps its argument in
        // a `(continue, [event])` tuple instead of echoing it bare.
        galaxy_vm::ffi::load_machine(std::ptr::null());
        let out = galaxy_vm::ffi::evaluate(request.len() as u32, request.as_ptr());
        let decoded = read_sentinel_terminated(out);
        assert_eq!(decoded[0], tag(AtomKind::Ap));
        assert!(decoded.windows(2).any(|w| w[0] == tag(AtomKind::Number) && w[1] == 3));
    }
}

unsafe fn read_sentinel_terminated<'a>(ptr: *const i64) -> &'a [i64] {
    let mut len = 0usize;
    while *ptr.add(len) != AtomKind::Gg.tag() {
        len += 1;
    }
    std::slice::from_raw_parts(ptr, len + 1)
}

#[test]
fn default_limits_match_the_documented_fixed_capacities() {
    let limits = Limits::default();
    assert_eq!(limits.arena_chunk_bytes, 200_000);
    assert_eq!(limits.function_table_capacity, 2_000);
    assert_eq!(limits.output_buffer_words, 100_000);
    assert_eq!(limits.bit_buffer_chars, 20_000);
}

#[test]
fn malformed_request_is_a_recoverable_error_at_the_machine_api() {
    let mut m = Machine::new(Limits::default());
    let request = [tag(AtomKind::Ap)];
    let error = m.evaluate(&request).unwrap_err();
    assert!(error.to_string().len() > 0);
}
