use gate_core::debounce::DebounceFilter;
use gate_core::snapshot::SensorSnapshot;

fn buttons(b0: bool, b1: bool) -> SensorSnapshot {
    SensorSnapshot::new([b0, b1], false, 0)
}

fn slider(position: u16) -> SensorSnapshot {
    SensorSnapshot::new([false, false], true, position)
}

#[test]
fn one_cycle_glitch_never_confirmed() {
    for threshold in 2..=5 {
        let mut filter = DebounceFilter::<2>::new(threshold, None);
        for _ in 0..threshold {
            filter.update(&buttons(false, false));
        }

        let glitch = filter.update(&buttons(true, false));
        assert_eq!(glitch.confirmed_buttons, [false, false], "threshold {threshold}");

        for _ in 0..10 {
            let state = filter.update(&buttons(false, false));
            assert_eq!(state.confirmed_buttons, [false, false], "threshold {threshold}");
        }
    }
}

#[test]
fn stable_change_confirms_after_threshold() {
    let mut filter = DebounceFilter::<2>::new(3, None);
    assert_eq!(filter.update(&buttons(true, true)).confirmed_buttons, [false, false]);
    assert_eq!(filter.update(&buttons(true, true)).confirmed_buttons, [false, false]);
    assert_eq!(filter.update(&buttons(true, true)).confirmed_buttons, [true, true]);
}

#[test]
fn button_glitch_does_not_delay_other_button() {
    let mut filter = DebounceFilter::<2>::new(2, None);
    filter.update(&buttons(true, false));
    filter.update(&buttons(true, true));
    let state = filter.update(&buttons(true, false));

    assert_eq!(state.confirmed_buttons, [true, false]);
}

#[test]
fn slider_glitch_keeps_previous_position() {
    let mut filter = DebounceFilter::<2>::new(2, None);
    filter.update(&slider(50));
    filter.update(&slider(50));
    assert_eq!(filter.state().confirmed_slider_position, Some(50));

    filter.update(&slider(250));
    let state = filter.update(&slider(50));
    assert_eq!(state.confirmed_slider_position, Some(50));
}

#[test]
fn moving_finger_confirms_once_still() {
    let mut filter = DebounceFilter::<2>::new(2, None);
    for position in [10, 20, 30, 40] {
        filter.update(&slider(position));
    }
    assert_eq!(filter.state().confirmed_slider_position, None);

    filter.update(&slider(40));
    assert_eq!(filter.state().confirmed_slider_position, Some(40));
}
