/*!
# Error Codes

A fault prints as `?` followed by the message and, for stored programs, the
line it happened on. `CATCH var` and `ERROR$` hold the message, or the
code text when there is no message.

Unknown commands, stray closers such as `NEXT` without `FOR`, and writes
to a constant are recorded and the program goes on. Hitting the iteration
limit or CTRL-C always ends the run. Everything else ends the run unless a
`TRY` block catches it.

|Code|Text|
|----|----|
|1|NEXT WITHOUT FOR|
|2|SYNTAX ERROR|
|3|RETURN WITHOUT GOSUB|
|4|OUT OF DATA|
|5|ILLEGAL FUNCTION CALL|
|6|OVERFLOW|
|7|OUT OF MEMORY|
|8|UNDEFINED LINE|
|9|SUBSCRIPT OUT OF RANGE|
|11|DIVISION BY ZERO|
|13|TYPE MISMATCH|
|18|UNDEFINED USER FUNCTION|
|26|FOR WITHOUT NEXT|
|29|WHILE WITHOUT WEND|
|30|WEND WITHOUT WHILE|
|31|LOOP WITHOUT DO|
|32|DO WITHOUT LOOP|
|33|UNKNOWN COMMAND|
|34|MISSING END|
|35|CONSTANT REASSIGNED|
|36|ITERATION LIMIT|
|37|UNHANDLED ERROR|
|38|ASSERTION FAILED|
|39|BREAK|
|51|INTERNAL ERROR|
|52|BAD FILE NUMBER|
|53|FILE NOT FOUND|
|54|BAD FILE MODE|
|57|DISK I/O ERROR|
|64|BAD FILE NAME|

## Conversions from other BASICs

Line numbers are optional. `GOTO`, `GOSUB` and `J:` accept either a
number or a label written as `name:` or `*name` on a line of its own.

`RANDOMIZE` with no argument reseeds from entropy. `RANDOMIZE 42` gives
the same sequence on every run, which is handy for tests.

Arrays made with `DIM A(10)` hold eleven elements, 0 through 10. Lists
made with `LIST` grow on demand and are indexed from 0 with `L[i]`.

*/
