/*!
# Introductory Tutorial for TempleCode

Start the interactive prompt with `templecode repl`. Type QUIT or CTRL-D
to leave. Stop a running program with CTRL-C.
<pre><code>&nbsp;  TempleCode 0.3.0
&nbsp;  tc> █
</code></pre>

A statement typed at the prompt runs immediately. Lines marked with "`>`"
below are the ones you type.

<pre><code>&nbsp;> PRINT "Hello World"
&nbsp;  Hello World
</code></pre>

Give a statement a line number and it is stored instead. `LIST` shows the
stored program and `RUN` runs it. Retype a number on its own to delete
that line.

<pre><code>&nbsp;> 10 FOR I = 1 TO 3
&nbsp;> 20 PRINT "Line "; I
&nbsp;> 30 NEXT I
&nbsp;> RUN
&nbsp;  Line 1
&nbsp;  Line 2
&nbsp;  Line 3
</code></pre>

Longer programs live in files and run with `templecode run file.tc`. Line
numbers are optional in files; jumps can target labels instead.

## Three languages on one line

Every line is routed by its shape. `T:` and the other single letter plus
colon commands are PILOT. Turtle words such as `FORWARD` and `RIGHT` are
Logo. Everything else is BASIC or one of the extensions.

<pre><code>&nbsp;  T:What is your name?
&nbsp;  A:NAME
&nbsp;  T:Hello $NAME, let's draw.
&nbsp;  REPEAT 4 [FORWARD 50 RIGHT 90]
&nbsp;  PRINT "The turtle is at "; TURTLE_X; ","; TURTLE_Y
</code></pre>

PILOT matching sets a flag that `Y:` and `N:` lines test.

<pre><code>&nbsp;  T:Do you like turtles?
&nbsp;  A:
&nbsp;  M:yes,sure,ok
&nbsp;  Y:T:Me too.
&nbsp;  N:T:Maybe later.
</code></pre>

Logo procedures are defined with `TO` and `END`, and their parameters are
read with a colon.

<pre><code>&nbsp;  TO SQUAREOF :SIZE
&nbsp;    REPEAT 4 [FORWARD :SIZE RIGHT 90]
&nbsp;  END
&nbsp;  SQUAREOF 80
</code></pre>

## Structured BASIC

Block IF, SELECT CASE, WHILE, DO and FOR nest freely, and SUB or FUNCTION
routines take parameters.

<pre><code>&nbsp;  FUNCTION SQUARE(N)
&nbsp;    RETURN N * N
&nbsp;  END FUNCTION
&nbsp;  FOR I = 1 TO 5
&nbsp;    IF SQUARE(I) > 10 THEN
&nbsp;      PRINT I; " is big"
&nbsp;    ELSE
&nbsp;      PRINT I
&nbsp;    END IF
&nbsp;  NEXT I
</code></pre>

## Lists and dicts

<pre><code>&nbsp;  LIST SCORES = 90, 72, 85
&nbsp;  PUSH SCORES, 60
&nbsp;  SORT SCORES DESC
&nbsp;  DICT PLAYER = name: "Ada", level: 3
&nbsp;  FOREACH S IN SCORES
&nbsp;    PRINT PLAYER.name; ": "; S
&nbsp;  NEXT S
</code></pre>

Errors stop the program with a message such as `?DIVISION BY ZERO IN 3`.
Wrap risky code in `TRY` and `CATCH` to keep going.

*/
