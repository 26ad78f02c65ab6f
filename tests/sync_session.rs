//! End to end protocol scenarios: raw bytes in, reply lines out.
use checkout_terminal_lib::{
    config::{DATA_SECTORS, PAGE_SIZE, RECORDS_ADDRESS, SECTOR_SIZE},
    devices::{
        catalog::{Catalog, ProductRecord},
        interfaces::{
            doubles::{MockDoor, RecordingDisplay, ScriptedPanel},
            Input,
        },
        protocol::{
            ring_buffer::{Producer, RingBuffer},
            Decoder,
        },
        terminal::{StateMirror, Terminal, TerminalState},
    },
    drivers::clock::SecondsClock,
    hal::doubles::{flash::FakeFlash, serial::MockSerial},
};

const RING: usize = 1024;

type SimTerminal<'a> =
    Terminal<'a, FakeFlash, MockSerial, RecordingDisplay, ScriptedPanel, MockDoor, SecondsClock>;

fn blank_catalog() -> Catalog<FakeFlash> {
    let size = RECORDS_ADDRESS as usize + DATA_SECTORS * SECTOR_SIZE;
    Catalog::init(FakeFlash::new(PAGE_SIZE, SECTOR_SIZE, size))
}

fn new_terminal<'a>(
    catalog: Catalog<FakeFlash>,
    clock: &'a SecondsClock,
    mirror: &'a StateMirror,
) -> SimTerminal<'a> {
    Terminal::new(
        catalog,
        MockSerial::default(),
        RecordingDisplay::default(),
        ScriptedPanel::default(),
        MockDoor::default(),
        clock,
        Some(mirror),
    )
}

/// Sends text the way the receive interrupt would, then runs the loop
/// until the queue is empty.
fn exchange(
    text: impl AsRef<[u8]>,
    producer: &mut Producer<'_, RING>,
    decoder: &mut Decoder<'_, RING>,
    terminal: &mut SimTerminal<'_>,
) {
    for &byte in text.as_ref() {
        producer.ingest_byte(byte).unwrap();
    }
    while !decoder.is_drained() {
        terminal.step(decoder).unwrap();
    }
    terminal.step(decoder).unwrap();
}

#[test]
fn full_sync_then_scan() {
    // Given
    let (clock, mirror) = (SecondsClock::new(), StateMirror::new());
    let mut ring = RingBuffer::<RING>::new();
    let (mut producer, consumer) = ring.split();
    let mut decoder = Decoder::new(consumer);
    let mut terminal = new_terminal(blank_catalog(), &clock, &mirror);

    // When
    exchange(
        "CMD:SYNC_START,TOTAL:3\r\n\
         CMD:SYNC_DATA,ID:6912345,PR:19.90,NM:Milk\r\n\
         CMD:SYNC_DATA,ID:42,PR:2.5,NM:Bread\r\n\
         CMD:SYNC_DATA,ID:7,PR:0.99,NM:Gum\r\n\
         CMD:SYNC_END,SUM:3\r\n\
         CMD:SCAN,ID:42\r\n",
        &mut producer,
        &mut decoder,
        &mut terminal,
    );

    // Then
    assert_eq!(terminal.serial().lines(), vec!["CMD:REQ_SYNC", "CMD:REPORT,ID:42,PR:2.50,NM:Bread"]);
    let catalog = terminal.catalog();
    assert_eq!(catalog.count(), 3);
    assert_eq!(catalog.read_record(0).unwrap(), Some(ProductRecord::new(6912345, 19.90, "Milk")));
    assert_eq!(catalog.read_record(2).unwrap(), Some(ProductRecord::new(7, 0.99, "Gum")));
    assert_eq!(terminal.cart().distinct(), 1);
}

#[test]
fn short_sync_is_rejected_and_leaves_nothing_to_scan() {
    // Given
    let (clock, mirror) = (SecondsClock::new(), StateMirror::new());
    let mut ring = RingBuffer::<RING>::new();
    let (mut producer, consumer) = ring.split();
    let mut decoder = Decoder::new(consumer);
    let mut terminal = new_terminal(blank_catalog(), &clock, &mirror);

    // When
    exchange(
        "CMD:SYNC_START,TOTAL:4\n\
         CMD:SYNC_DATA,ID:1,PR:1,NM:a\n\
         CMD:SYNC_DATA,ID:2,PR:2,NM:b\n\
         CMD:SYNC_DATA,ID:3,PR:3,NM:c\n\
         CMD:SYNC_END,SUM:4\n\
         CMD:SCAN,ID:1\n",
        &mut producer,
        &mut decoder,
        &mut terminal,
    );

    // Then
    assert_eq!(terminal.serial().lines(), vec![
        "CMD:REQ_SYNC",
        "CMD:ALARM,LEVEL:2,MSG:Sync_Mismatch_Error",
        "CMD:ALARM,LEVEL:1,MSG:Item_Not_Found",
    ]);
    assert_eq!(terminal.catalog().count(), 0);
}

#[test]
fn committed_catalog_survives_a_restart() {
    // Given
    let (clock, mirror) = (SecondsClock::new(), StateMirror::new());
    let flash = {
        let mut ring = RingBuffer::<RING>::new();
        let (mut producer, consumer) = ring.split();
        let mut decoder = Decoder::new(consumer);
        let mut terminal = new_terminal(blank_catalog(), &clock, &mirror);
        exchange(
            "CMD:SYNC_START,TOTAL:1\nCMD:SYNC_DATA,ID:99,PR:5.00,NM:Soap\nCMD:SYNC_END,SUM:1\n",
            &mut producer,
            &mut decoder,
            &mut terminal,
        );
        terminal.into_catalog().release()
    };

    // When
    let mut restarted = Catalog::init(flash);

    // Then
    assert_eq!(restarted.count(), 1);
    assert_eq!(restarted.find_by_id(99).unwrap().unwrap().name.as_str(), "Soap");
}

#[test]
fn unknown_lines_and_noise_do_not_disturb_a_session() {
    // Given
    let (clock, mirror) = (SecondsClock::new(), StateMirror::new());
    let mut ring = RingBuffer::<RING>::new();
    let (mut producer, consumer) = ring.split();
    let mut decoder = Decoder::new(consumer);
    let mut terminal = new_terminal(blank_catalog(), &clock, &mirror);

    // When
    exchange(
        "CMD:SYNC_START,TOTAL:2\n\
         PING\n\
         CMD:SYNC_DATA,ID:1,PR:1,NM:a\n\
         CMD:SYNC_DATA,ID:oops,PR:1,NM:b\n\
         CMD:SYNC_START,TOTAL:9\n\
         CMD:SYNC_DATA,ID:2,PR:2,NM:c\n\
         CMD:SYNC_END,SUM:2\n",
        &mut producer,
        &mut decoder,
        &mut terminal,
    );

    // Then
    assert_eq!(terminal.serial().lines(), vec![
        "CMD:REQ_SYNC",
        "CMD:ALARM,LEVEL:2,MSG:Invalid_ID",
        "CMD:ALARM,LEVEL:1,MSG:Busy_Syncing",
    ]);
    assert_eq!(terminal.catalog().count(), 2);
    assert_eq!(terminal.state(), TerminalState::Idle);
}

#[test]
fn shopping_session_around_a_sync() {
    // Given
    let (clock, mirror) = (SecondsClock::new(), StateMirror::new());
    let mut ring = RingBuffer::<RING>::new();
    let (mut producer, consumer) = ring.split();
    let mut decoder = Decoder::new(consumer);
    let mut terminal = new_terminal(blank_catalog(), &clock, &mirror);
    exchange(
        "CMD:SYNC_START,TOTAL:1\nCMD:SYNC_DATA,ID:5,PR:3.25,NM:Tea\nCMD:SYNC_END,SUM:1\n",
        &mut producer,
        &mut decoder,
        &mut terminal,
    );
    terminal.serial().clear();

    // When
    terminal.panel().press(Input::Begin);
    exchange("CMD:SCAN,ID:5\nCMD:SCAN,ID:5\n", &mut producer, &mut decoder, &mut terminal);
    terminal.panel().press(Input::Checkout);
    terminal.panel().press(Input::ConfirmPayment);
    exchange("", &mut producer, &mut decoder, &mut terminal);
    terminal.step(&mut decoder).unwrap();

    // Then
    assert_eq!(terminal.serial().lines(), vec![
        "CMD:REPORT,ID:5,PR:3.25,NM:Tea",
        "CMD:REPORT,ID:5,PR:3.25,NM:Tea",
        "CMD:PAY_OFF,TOTAL:1",
    ]);
    assert_eq!(terminal.state(), TerminalState::Idle);
    assert_eq!(terminal.display().totals, vec![3.25, 6.5, 0.0]);
}

#[test]
fn line_noise_and_decimal_counts_still_close_a_session() {
    // Given
    let (clock, mirror) = (SecondsClock::new(), StateMirror::new());
    let mut ring = RingBuffer::<RING>::new();
    let (mut producer, consumer) = ring.split();
    let mut decoder = Decoder::new(consumer);
    let mut terminal = new_terminal(blank_catalog(), &clock, &mirror);

    // When
    exchange(
        &b"CMD:SYNC_START,TOTAL:2.0\n\
           CMD:SYNC_DATA,ID:1,PR:1e1,NM:Rice\n\
           \xFF\xFECMD:SYNC_DATA,ID:2,PR:0.5.1,NM:Salt\n\
           \xFFCMD:SYNC_END,SUM:2.0\n"[..],
        &mut producer,
        &mut decoder,
        &mut terminal,
    );

    // Then
    assert_eq!(terminal.serial().lines(), vec!["CMD:REQ_SYNC"]);
    assert_eq!(terminal.state(), TerminalState::Idle);
    assert!(terminal.session().is_idle());
    let catalog = terminal.catalog();
    assert_eq!(catalog.count(), 2);
    assert_eq!(catalog.read_record(0).unwrap(), Some(ProductRecord::new(1, 10.0, "Rice")));
    assert_eq!(catalog.read_record(1).unwrap(), Some(ProductRecord::new(2, 0.5, "Salt")));
}
