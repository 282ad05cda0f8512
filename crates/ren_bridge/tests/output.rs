//! Engine output redirection. Own binary: the sink is engine-wide.

use pretty_assertions::assert_eq;
use ren_bridge::{default_engine, evaluate, loadables, OutputSink};

#[test]
fn print_goes_to_the_capture_buffer() {
    let Ok(engine) = default_engine() else {
        panic!("no engine");
    };
    let Ok(buffer) = engine.capture_output() else {
        panic!("capture failed");
    };
    let Ok(_) = evaluate(&loadables!["print 1 + 2 print \"done\""]) else {
        panic!("print failed");
    };
    assert_eq!(buffer.take(), "3\ndone\n");

    let Ok(()) = engine.set_output(OutputSink::Silent) else {
        panic!("set_output failed");
    };
    let Ok(_) = evaluate(&loadables!["print \"lost\""]) else {
        panic!("print failed");
    };
    assert_eq!(buffer.contents(), "");
}
