//! Prompt text for each phase.

use std::path::Path;

use toolsmith_action::truncate_str;

use crate::definition::{Repository, ToolDefinition};

/// Told to the model after each sandbox reset.
pub const RESET_NOTE: &str = "I reset the environment to the freshly installed repository, and will now execute the updated function you wrote.";

/// Assessment reasoning used when the function exited non-zero.
pub const NONZERO_EXIT_REASONING: &str = "The function call failed with a non-zero exit code.";

/// System prompt shared by the agent phases.
pub fn system(workspace_dir: &Path) -> String {
    format!(
        "You're a careful software engineer AI. You cannot see, draw or use a browser, but you can read and write files, run commands and think.
The user will give you a task. It will usually take several actions to complete, and you can only run one action at a time.

Use the tools (actions) available to you. Every time you call a tool, give a one-sentence summary of why you are calling it and what you expect it to achieve.

Your workspace directory and current working directory is `{}`.

Keep calling tools until the task is complete.",
        workspace_dir.display()
    )
}

/// System prompt for phases that run after installation.
pub fn system_installed(definition: &ToolDefinition, workspace_dir: &Path) -> String {
    format!(
        "{}\n\nYou have already installed the {} repository and its dependencies at `{}`.",
        system(workspace_dir),
        definition.repo.name,
        definition.install_path(workspace_dir).display()
    )
}

fn install_env_note(repo: &Repository) -> String {
    if repo.env.is_empty() {
        return String::new();
    }
    format!(
        "IMPORTANT: these environment variables are set in your system environment: {}.
They are available automatically when you use the `run_bash_command` tool; you do not need to pass them in the tool's `env` field.
",
        env_names(repo)
    )
}

fn code_env_note(repo: &Repository) -> String {
    if repo.env.is_empty() {
        return String::new();
    }
    format!(
        "IMPORTANT: these environment variables are set in your system environment: {}.
Your python function can read them (for example through `os.environ`). Subprocesses do not see them unless you pass them on explicitly from `os.environ`.
",
        env_names(repo)
    )
}

fn env_names(repo: &Repository) -> String {
    repo.env
        .keys()
        .map(|k| format!("`{k}`"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Ask the agent to clone and set up the repository.
pub fn install(definition: &ToolDefinition, workspace_dir: &Path) -> String {
    let install_path = definition.install_path(workspace_dir);
    format!(
        "Clone the {name} repository from GitHub and set it up locally.
Steps:
1. Git clone the repository {info} into `{path}`.
2. Find the README (it may not be in the root directory) and follow its setup instructions closely so the whole repository is set up correctly.
3. Carry out every installation, configuration, download or setup step it describes. For Python repositories, prefer `pip` over conda, virtualenv and the like, and install the repository and its dependencies globally. Do not use Docker or other container tools, even if the README suggests them.
4. Finish every step so that a user can use the repository right away without further setup, installation or downloads. This includes pretrained models. Do NOT download datasets.
If you run into problems, try to solve them.

{env}
Set the repository up so that it can later be used for this task:
<intended_task>
{summary}
</intended_task>
IMPORTANT: right now your job is only to set up the repository, NOT to implement the task.

Keep calling tools until the repository is installed and set up.
When you are done, give a short summary of what you did and achieved, and the absolute path of the cloned and installed repository.",
        name = definition.repo.name,
        info = definition.repo.info(),
        path = install_path.display(),
        env = install_env_note(&definition.repo),
        summary = definition.xml_summary(),
    )
}

/// Ask the agent to explore the installed repository.
pub fn explore(definition: &ToolDefinition, workspace_dir: &Path) -> String {
    format!(
        "# Background
The repository `{repo}` is fully set up and installed at `{path}`.
We need to wrap one piece of its functionality in a standalone python function that can be called on its own.
The function will be called `{name}` and is described as follows:
<description>
{description}
</description>

It takes these arguments:
<arguments>
{arguments}
</arguments>

# Approach
The function will be written in three steps:
1. Explore the repository and gather everything needed to write a plan.
2. Write a plan for the function body as very high-level pseudo-code.
3. Write the function from the plan.

# Task
You are at step 1. Be thorough: you will rely on what you find here when implementing the function.
Explore the repository, reading only relevant files, using your tools to read files, list directories, search and so on.
HINT 1: README files are usually a good place to start. There may be none or several; always look for them and prefer their instructions.
HINT 2: If the repository has a command line interface, prefer calling it through a subprocess over calling the underlying python functions. Wrap python functions only as a last resort.
HINT 3: Do NOT try to read images, audio or other binary files.
Skip files that are not relevant to the task.
**Do read ALL files (documentation, code, configuration and so on) needed to implement the function. It must be possible to implement the function from the plan and the files you read alone.**
**Read the code you intend to wrap so that you understand its inputs and outputs, especially when it writes output files that the function will have to read.**
Do NOT write the function yet.

Once you have gathered ALL relevant information, reply with a one-paragraph summary of your findings.

As a reminder, the function must do the following:
<description>
{description}
</description>

Its signature will be:
```python
{signature}
```",
        repo = definition.repo.name,
        path = definition.install_path(workspace_dir).display(),
        name = definition.name,
        description = definition.description,
        arguments = definition.arguments_xml(),
        signature = definition.signature(),
    )
}

/// Ask for a numbered outline of the function body.
pub fn plan(definition: &ToolDefinition) -> String {
    format!(
        "Using what you found, write an outline (plan) for the body of the function as very high-level pseudo-code.
Make it a numbered list of steps, each describing what happens in that step.
Reply with the list only.
As a reminder, the function must do the following: `{}`

Its signature will be:
```python
{}
```",
        definition.description,
        definition.signature()
    )
}

/// Requirements shared by the implement and rewrite prompts.
pub fn coding_instructions(definition: &ToolDefinition) -> String {
    format!(
        "You **must** output one valid, standalone python function that a user can call without changes.
Requirements:
1. Import every module or library you need.
2. Write exactly one python function. It starts with 'def ...' and ends with 'return ...'.
3. Output nothing but the function definition: no prose, no test code.
4. The function must be callable on its own.
5. Put all required imports inside the function.
6. The function must perform its task: `{description}`.
7. It accepts every required parameter.
8. It has type hints and a docstring.
9. It is named exactly `{name}`.
10. It is valid python that an interpreter can execute.

{env}
Further instructions:
* Make the function easy to debug: print plenty of progress messages, periodically for long-running work.
* When catching exceptions, print the full stack trace to stderr (for example with `traceback.format_exc()`).
* When running commands or scripts, stream their stdout and stderr to the parent process with `run_and_stream_command` from the `subprocess_utils` module. It takes the same arguments as `subprocess.Popen` and returns `(return_code, output)`, where output holds stdout and stderr combined. Set `cwd` appropriately.
  Example:
  ```python
  from subprocess_utils import run_and_stream_command  # this import is required
  return_code, output = run_and_stream_command(\"echo hello && echo world\", shell=True, env={{\"MY_VAR\": \"my_value\"}}, cwd=\"/workspace/my_project\")  # shell=True is the default
  ```
* Never run interactive commands. If a function you call is interactive, find a way around it; as a last resort, patch out the interactive part.
* Prefer importing existing functions or running existing scripts and modules over writing your own implementation.",
        description = definition.description,
        name = definition.name,
        env = code_env_note(&definition.repo),
    )
}

/// Ask for the first implementation.
pub fn implement(definition: &ToolDefinition, plan: &str, workspace_dir: &Path) -> String {
    let arguments = definition
        .arguments
        .iter()
        .map(|arg| format!("- {}: {} ({})", arg.name, arg.arg_type, arg.description))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "With the plan in place, write the actual implementation of the function.
It must be a standalone python function that can be called on its own.
It is called `{name}` and is described as: `{description}`.
Its arguments are:
{arguments}

Its signature will be:
```python
{signature}
```

Write the function following the plan you made:
<plan>
{plan}
</plan>

{instructions}

Use the repository `{repo}` (installed at `{path}`) to complete the task.
Make sure the function works as-is, without changes by a user. Often, running an existing function, script or module in a subprocess is enough.
Reply with the code of the function only.",
        name = definition.name,
        description = definition.description,
        signature = definition.signature(),
        instructions = coding_instructions(definition),
        repo = definition.repo.name,
        path = definition.install_path(workspace_dir).display(),
    )
}

/// Ask the model whether a run succeeded.
pub fn assess(definition: &ToolDefinition, result: &str, stdout: &str) -> String {
    format!(
        "I executed the function you wrote.
Based on its output and returned result, assess whether the call was successful, that is, whether the function did what it was supposed to do.
Check that the returned result is plausible and agrees with the stdout/stderr logs where applicable.
As a reminder, the task is:
<task_description>
{description}
</task_description>

Expected result:
<expected_result_description>
{returns}
</expected_result_description>

Returned result:
<result>
{result}
</result>

Output (stdout and stderr) of the function:
<output>
{stdout}
</output>

**IMPORTANT: the returned result itself must be correct: the result dict must have the right keys and values, with the right types and shapes. If anything is off, the call is NOT successful; say so in your reasoning.**",
        description = definition.description,
        returns = definition.description_of_returns(),
        result = truncate_str(result, 10_000),
        stdout = truncate_str(stdout, 10_000),
    )
}

/// Ask the agent to find out why the function failed.
pub fn diagnose(summaries: &[String], code: &str, stdout: &str, assessment: &str) -> String {
    let attempts = summaries.len();
    let summaries = summaries
        .iter()
        .enumerate()
        .map(|(i, s)| format!("<summary number={i}>{s}</summary>"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "Your implementation did not work. This was attempt number {attempts} at fixing it.

Below are summaries of the earlier problems and your attempts to fix them. Keep them in mind and do not repeat the same mistakes.
<summaries>
{summaries}
</summaries>

This is the current version of your code (after {attempts} attempts).
IMPORTANT: it is the most recent version, so focus on it when diagnosing.
```python
{code}
```

Running this function produced another error.
Your task now is to diagnose the problem.
You cannot see, draw or use a browser, but you can read and write files, run commands and think.
You get the stdout and stderr of the run below.
First use your tools (running commands, listing directories, reading files and so on) to gather information and find the root cause. This often means reading code in the repository to see how the problem arises and which of your assumptions were wrong.
Then write a plan to fix it and reply with that plan.

NOTE: the plan is the immediate change to make to the function. You will then be asked for the code implementing it, I will run that code, and you will get the new output.
If after exploring you still do not know what is wrong, plan to add more logging to the function so the next run tells you more.

IMPORTANT: you can change the environment (write files, run commands), but all changes are lost when the function runs again because the environment is reset. Use this step only to gather information, not to fix things.
HINT: the information you gather may suggest a different approach; if so, put it in your plan.
HINT: prefer importing code from the repository over reimplementing it.

Output (stdout and stderr) of the function:
<output>
{stdout}
</output>

Why the call was judged unsuccessful:
<assessment>
{assessment}
</assessment>

Again, your immediate task is to diagnose the problem and write a plan to fix it.",
        stdout = truncate_str(stdout, 20_000),
    )
}

/// Ask for the repaired function.
pub fn rewrite(definition: &ToolDefinition, code: &str, diagnosis: &str, plan: &str) -> String {
    format!(
        "With the problem and a fix identified, write the updated implementation of the function.
It is called `{name}` and is described as: `{description}`.
Its arguments are:
<arguments>
{arguments}
</arguments>

Its signature will be:
```python
{signature}
```

Use what you gathered to fix the function.

{instructions}

The current draft is:
```python
{code}
```

Your diagnosis:
<diagnosis>
{diagnosis}
</diagnosis>

Your plan to fix it:
<plan>
{plan}
</plan>

Reply with the updated function code only.",
        name = definition.name,
        description = definition.description,
        arguments = definition.arguments_xml(),
        signature = definition.signature(),
        instructions = coding_instructions(definition),
    )
}

/// Ask for a summary of the latest repair attempt.
pub const SUMMARIZE: &str = "Summarize in one paragraph the most recent problem, how you diagnosed it and how this code change tries to fix it.
Be specific and include file paths and any other relevant details.
The summary must hold everything needed to implement the fix, along with the key observations behind the diagnosis.
Start your reply with \"The problem was...\"";
