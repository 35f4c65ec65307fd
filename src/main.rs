//! picovm CLI: run, disassemble, or interactively debug bytecode files.

use std::env;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use colored::Colorize;

use picovm::vm::{disassembler, Debugger, Program, Vm};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CLI command to execute.
enum Command {
    /// Run a bytecode file to completion.
    Run { file: String, disasm: bool },
    /// Print the disassembly of a bytecode file.
    Disasm { file: String },
    /// Interactive debug session over a bytecode file.
    Debug { file: String },
}

fn print_usage() {
    eprintln!("picovm {} - bytecode virtual machine", VERSION);
    eprintln!();
    eprintln!("Usage: picovm run <program.byc> [--disasm]");
    eprintln!("       picovm disasm <program.byc>");
    eprintln!("       picovm debug <program.byc>");
}

fn parse_args(args: &[String]) -> Option<Command> {
    match args {
        [cmd, file] if cmd == "run" => Some(Command::Run {
            file: file.clone(),
            disasm: false,
        }),
        [cmd, file, flag] if cmd == "run" && flag == "--disasm" => Some(Command::Run {
            file: file.clone(),
            disasm: true,
        }),
        [cmd, file] if cmd == "disasm" => Some(Command::Disasm { file: file.clone() }),
        [cmd, file] if cmd == "debug" => Some(Command::Debug { file: file.clone() }),
        _ => None,
    }
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Some(command) => command,
        None => {
            print_usage();
            process::exit(1);
        }
    };
    match command {
        Command::Run { file, disasm } => cmd_run(&file, disasm),
        Command::Disasm { file } => {
            let program = load_program(&file);
            print!("{}", disassembler::disassemble(&program));
        }
        Command::Debug { file } => cmd_debug(&file),
    }
}

fn load_program(file: &str) -> Program {
    match Program::from_file(Path::new(file)) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            process::exit(1);
        }
    }
}

fn cmd_run(file: &str, disasm: bool) {
    let program = load_program(file);
    if disasm {
        print!("{}", disassembler::disassemble(&program));
        println!();
    }
    let mut vm = Vm::new(program);
    let result = vm.run();

    if let Err(fault) = &result {
        eprintln!("{} {}", "fault:".red().bold(), fault);
    }
    if !vm.stack().is_empty() {
        let values: Vec<String> = vm.stack().iter().map(|v| v.to_string()).collect();
        println!("final stack (bottom -> top): {}", values.join(" "));
    }
    println!(
        "instructions executed: {} | max stack depth: {}",
        vm.instruction_count(),
        vm.max_stack_depth()
    );
    if result.is_err() {
        process::exit(1);
    }
}

fn cmd_debug(file: &str) {
    let program = load_program(file);
    let mut debugger = Debugger::new(Vm::new(program));

    println!("picovm {} debug session", VERSION);
    println!("Commands: step next run continue halt regs print info memstat");
    println!("          bytecode break <addr> clear <addr> quit");

    let stdin = io::stdin();
    loop {
        print!("{} ", "(picovm)".cyan());
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                if line == "quit" || line == "exit" {
                    break;
                }
                match debugger.handle_command(line) {
                    Ok(Some(output)) => println!("{}", output.trim_end()),
                    // Unrecognized commands are ignored, matching the
                    // external shell contract.
                    Ok(None) => {}
                    Err(fault) => eprintln!("{} {}", "fault:".red().bold(), fault),
                }
            }
            Err(_) => break,
        }
    }
}
