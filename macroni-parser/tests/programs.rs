// Whole-program parsing tests
// Realistic automation scripts exercising most of the grammar together

use macroni_parser::{ast::*, parse_program, parse_program_with_source};

const FARMING_SCRIPT: &str = r#"
# click through a list of targets until the stop key
import "common.macroni";

@set_template_dir("./templates/farm");
targets = ["tree", "rock", "ore"];
clicks = 0;

fn click_target(name) {
    outer clicks;
    loc = @find_template(name);
    if loc == null { return 0; }
    x, y = loc;
    @mouse_move(x, y, 200, true);
    @left_click();
    clicks = clicks + 1;
    return 1;
}

i = 0;
while i < @len(targets) {
    found = click_target(targets[i]);
    if !found { }
    @wait(150, 50, 120);
    i = i + 1;
}
"#;

fn statement_names(program: &Program) -> Vec<&'static str> {
    program.statements.iter().map(|s| s.kind.name()).collect()
}

#[test]
fn test_rejects_unknown_prefix_operator() {
    // `!` is not an operator in this language
    assert!(parse_program(FARMING_SCRIPT).is_err());
}

#[test]
fn test_parse_farming_script() {
    let script = FARMING_SCRIPT.replace("if !found { }", "if found == 0 { }");
    let program = parse_program_with_source(&script, Some("farm.macroni".to_string())).unwrap();

    assert_eq!(program.source_file.as_deref(), Some("farm.macroni"));
    assert_eq!(
        statement_names(&program),
        vec![
            "import_stmt",
            "expr_stmt",
            "store_val",
            "store_val",
            "func_def",
            "store_val",
            "loop_stmt",
        ]
    );

    let StatementKind::FunctionDefinition(func) = &program.statements[4].kind else {
        panic!("Expected function definition");
    };
    let body: Vec<_> = func.body.statements.iter().map(|s| s.kind.name()).collect();
    assert_eq!(
        body,
        vec![
            "outer_stmt",
            "store_val",
            "expr_stmt",
            "store_val",
            "expr_stmt",
            "expr_stmt",
            "store_val",
            "return_stmt",
        ]
    );
    assert_eq!(func.span.line, 9);
}

#[test]
fn test_builtin_calls_inside_conditions() {
    let program = parse_program("while @time() < deadline { @wait(10); }").unwrap();
    let StatementKind::While(while_loop) = &program.statements[0].kind else {
        panic!("Expected while loop");
    };
    let ExpressionKind::BinaryOp(cmp) = &while_loop.condition.kind else {
        panic!("Expected comparison");
    };
    assert!(matches!(
        &cmp.left.kind,
        ExpressionKind::BuiltinCall(BuiltinCall {
            builtin: Builtin::Time,
            ..
        })
    ));
}

#[test]
fn test_record_and_playback_script() {
    let source = r#"
        if @recording_exists("login") == 0 {
            @record("login", "f8", "f9");
        }
        @playback("login");
    "#;
    let program = parse_program(source).unwrap();
    assert_eq!(statement_names(&program), vec!["expr_stmt", "expr_stmt"]);
}
