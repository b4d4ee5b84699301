use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::panic;
use std::process;
use tinylisp::ast::Value;
use tinylisp::evaluator::{self, Environment};
use tinylisp::reader;

fn main() {
    // Script mode: evaluate a source file and exit.
    if let Some(path) = std::env::args().nth(1) {
        process::exit(run_script(&path));
    }

    let result = panic::catch_unwind(|| {
        run_repl();
    });

    if let Err(panic_info) = result {
        eprintln!("The REPL encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

/// Evaluate every top-level form in `path` against a fresh global
/// environment. Output happens only through `display`; the first error
/// aborts the run.
fn run_script(path: &str) -> i32 {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("Error reading {path}: {e}");
            return 1;
        }
    };

    let forms = match reader::read_all(&source) {
        Ok(forms) => forms,
        Err(e) => {
            eprintln!("Error in {path}: {e}");
            return 1;
        }
    };

    let env = evaluator::create_global_env();
    for form in &forms {
        if let Err(e) = evaluator::eval(form, &env) {
            eprintln!("Error in {path}: {e}");
            return 1;
        }
    }

    0
}

fn run_repl() {
    println!("TinyLisp Interpreter");
    println!("Enter S-expressions like: (+ 1 2)");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = DefaultEditor::new().expect("Could not initialize REPL");
    let env = evaluator::create_global_env();

    // Make help reachable from user code as well as via :help
    env.register_typed_primitive::<_, (), Value>("help", print_help);

    loop {
        match rl.readline("tinylisp> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Handle special commands
                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&env);
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                // A line may contain several top-level forms; evaluate them
                // in order, printing every non-Unspecified result.
                match reader::read_all(line) {
                    Ok(forms) => {
                        for form in &forms {
                            match evaluator::eval(form, &env) {
                                Ok(result) => {
                                    // Don't print Unspecified values (e.g., from define)
                                    if !matches!(result, Value::Unspecified) {
                                        println!("{result}");
                                    }
                                }
                                Err(e) => {
                                    println!("Error: {e}");
                                    break;
                                }
                            }
                        }
                    }
                    Err(e) => println!("Error: {e}"),
                }
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

fn print_help() -> Value {
    println!("TinyLisp Interpreter:");
    println!("  :help      - Show this help message");
    println!("  :env       - Show current environment bindings");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!("  Ctrl+C     - Exit the interpreter");
    println!();
    println!("Supported syntax:");
    println!("  Numbers: 42, -5, 2.5");
    println!("  Booleans: #t/#f (also bound as True/False)");
    println!("  Strings: \"hello\" (no escape sequences)");
    println!("  Quoting: 'expr or (quote expr)");
    println!();
    println!("Special forms:");
    println!("  quote, if, define, set!, lambda, begin, cond, and, or");
    println!();
    println!("Examples:");
    println!("  (+ 1 2 3)");
    println!("  (define (square x) (* x x))");
    println!("  (square 7)");
    println!("  (if (< 1 2) \"yes\" \"no\")");
    println!();

    Value::Unspecified
}

fn print_environment(env: &Environment) {
    let bindings = env.all_bindings();

    if bindings.is_empty() {
        println!("Environment is empty.");
        return;
    }

    println!("Environment bindings ({} total):", bindings.len());
    println!();

    // Separate built-in procedures from user-defined values
    let mut primitives = Vec::new();
    let mut user_defined = Vec::new();

    for (name, value) in bindings {
        match value {
            Value::Primitive { .. } => primitives.push(name),
            _ => user_defined.push((name, value)),
        }
    }

    if !primitives.is_empty() {
        println!("Built-in procedures ({}):", primitives.len());
        // Print in columns for readability
        let mut col = 0;
        for name in primitives {
            print!("  {name:<15}");
            col += 1;
            if col % 4 == 0 {
                println!();
            }
        }
        if col % 4 != 0 {
            println!();
        }
        println!();
    }

    if !user_defined.is_empty() {
        println!("User-defined values ({}):", user_defined.len());
        for (name, value) in user_defined {
            println!("  {name} = {value}");
        }
    }
}
